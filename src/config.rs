//! 配置加载
//!
//! 必需配置来自环境变量（可选地从工作目录下的 `.env` 文件补充）：
//! `BOT_TOKEN` `CHAT_ID` `GITLAB_URL` `GITLAB_TOKEN` `PROJECT_ID`，
//! 以及可选的 `WEBHOOK_SECRET`。
//!
//! 运行参数（轮询间隔、不活跃天数等）读取优先级：
//! 1. 环境变量 `GAM_POLL_INTERVAL_SECS` / `GAM_INACTIVITY_DAYS` / `GAM_INACTIVITY_CHECK_SECS`
//! 2. 配置文件 `~/.config/gitlab-activity-monitor/config.json`
//! 3. 内置默认值

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// 必需的环境变量，按报告顺序排列
pub const REQUIRED_KEYS: [&str; 5] = ["BOT_TOKEN", "CHAT_ID", "GITLAB_URL", "GITLAB_TOKEN", "PROJECT_ID"];

/// UTF-8 BOM
const BOM: char = '\u{feff}';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("failed to read {path}: {message}")]
    DotEnv { path: PathBuf, message: String },
}

/// 连接配置
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Telegram bot token
    pub bot_token: String,
    /// 通知目标 chat
    pub chat_id: String,
    /// GitLab 地址（已去掉末尾的 `/`）
    pub gitlab_url: String,
    pub gitlab_token: String,
    /// 数字 ID 或 `group/project` 路径
    pub project_id: String,
    /// 预留给 webhook 模式，轮询不使用
    pub webhook_secret: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("gitlab_url", &self.gitlab_url)
            .field("gitlab_token", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// 从 `.env` 和进程环境加载
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv(Path::new(".env"))?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意 key/value 来源加载，空值视为缺失
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let required = |key: &str| get(key).unwrap_or_default();
        Ok(Self {
            bot_token: required("BOT_TOKEN"),
            chat_id: required("CHAT_ID"),
            gitlab_url: required("GITLAB_URL").trim_end_matches('/').to_string(),
            gitlab_token: required("GITLAB_TOKEN"),
            project_id: required("PROJECT_ID"),
            webhook_secret: get("WEBHOOK_SECRET"),
        })
    }
}

/// 解析 `.env` 内容
///
/// 支持 `KEY=value`、`export KEY=value`、`#` 注释和成对引号；忽略开头的 BOM
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .trim_start_matches(BOM)
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    // 未加引号的值允许行尾注释
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    }
}

/// 把 `.env` 中的变量写入进程环境，已存在的环境变量优先
///
/// 文件不存在时直接返回，返回实际写入的变量数
pub fn load_dotenv(path: &Path) -> Result<usize, ConfigError> {
    if !path.exists() {
        return Ok(0);
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::DotEnv {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut applied = 0;
    for (key, value) in parse_dotenv(&content) {
        if std::env::var_os(&key).is_none() {
            std::env::set_var(&key, value);
            applied += 1;
        }
    }
    debug!(path = %path.display(), applied, "Loaded .env file");
    Ok(applied)
}

/// 运行参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// 轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 不活跃检查间隔（秒）
    pub inactivity_check_secs: u64,
    /// 不活跃阈值（天）
    pub inactivity_days: i64,
    /// 提交查询的时间窗口（分钟）
    pub commit_window_mins: i64,
    /// 每类事件去重缓存上限
    pub cache_max_entries: usize,
    /// 两条消息之间的最小间隔（毫秒）
    pub send_interval_ms: u64,
    /// 整个周期出错后的退避时间（秒）
    pub error_backoff_secs: u64,
    /// 每次查询的 pipeline 数量
    pub pipeline_limit: u32,
    /// HTTP 请求超时（秒）
    pub http_timeout_secs: u64,
    /// 启动时用项目成员列表预先登记成员
    pub seed_members: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            inactivity_check_secs: 3600,
            inactivity_days: 2,
            commit_window_mins: 10,
            cache_max_entries: crate::state::DEFAULT_MAX_ENTRIES,
            send_interval_ms: 1000,
            error_backoff_secs: 60,
            pipeline_limit: 5,
            http_timeout_secs: 30,
            seed_members: true,
        }
    }
}

impl MonitorSettings {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config/gitlab-activity-monitor/config.json")
    }

    /// 从默认配置文件和环境变量加载
    pub fn load() -> Self {
        Self::load_from(&Self::default_path()).with_env_overrides(|key| std::env::var(key).ok())
    }

    /// 从指定文件加载，文件缺失或格式错误时使用默认值
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str::<Self>(&content).map_err(anyhow::Error::from))
        {
            Ok(settings) => {
                debug!(path = %path.display(), "Loaded monitor settings");
                settings
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid settings file, using defaults");
                Self::default()
            }
        }
    }

    /// 应用环境变量覆盖，无法解析的值会被忽略
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(key, value = %raw, "Ignoring unparsable override");
                    None
                }
            }
        }

        if let Some(v) = parse("GAM_POLL_INTERVAL_SECS", lookup("GAM_POLL_INTERVAL_SECS")) {
            self.poll_interval_secs = v;
        }
        if let Some(v) = parse("GAM_INACTIVITY_DAYS", lookup("GAM_INACTIVITY_DAYS")) {
            self.inactivity_days = v;
        }
        if let Some(v) = parse("GAM_INACTIVITY_CHECK_SECS", lookup("GAM_INACTIVITY_CHECK_SECS")) {
            self.inactivity_check_secs = v;
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn inactivity_check_interval(&self) -> Duration {
        Duration::from_secs(self.inactivity_check_secs)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn commit_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.commit_window_mins)
    }
}
