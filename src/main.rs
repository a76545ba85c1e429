//! GitLab Activity Monitor CLI
//!
//! 轮询 GitLab 项目的新提交、MR、issue 和 pipeline，推送到 Telegram

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gitlab_activity_monitor::{
    gitlab::{Project, User},
    telegram::BotUser,
    CommandContext, CommandListener, Config, GitlabClient, MonitorSettings, MonitorState,
    NotificationSink, Poller, StdoutChannel, TelegramChannel, TelegramClient, ThrottledSink,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "gam")]
#[command(about = "GitLab Activity Monitor - 轮询 GitLab 项目动态并推送到 Telegram")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动轮询和命令监听（默认）
    Run,
    /// 检查配置和连接后退出
    Check {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 执行一次轮询周期
    PollOnce {
        /// 只打印消息，不发送到 Telegram
        #[arg(long)]
        dry_run: bool,
    },
}

/// `gam check` 的输出
#[derive(Serialize)]
struct CheckReport {
    gitlab_url: String,
    gitlab_user: String,
    project: Project,
    bot: Option<String>,
    chat_id: String,
    webhook_secret_set: bool,
}

/// 启动阶段的连接结果
struct Connections {
    gitlab: GitlabClient,
    user: User,
    project: Project,
}

async fn connect_gitlab(config: &Config, settings: &MonitorSettings) -> Result<Connections> {
    let gitlab = GitlabClient::new(
        &config.gitlab_url,
        &config.gitlab_token,
        &config.project_id,
        settings.http_timeout(),
    )?;
    let (user, project) = gitlab
        .connect()
        .await
        .with_context(|| format!("cannot connect to GitLab project {} at {}", config.project_id, config.gitlab_url))?;
    info!(gitlab = %config.gitlab_url, user = %user.username, "Connected to GitLab");
    info!(project = %project.name, id = project.id, "Project found");
    Ok(Connections { gitlab, user, project })
}

async fn connect_telegram(config: &Config, settings: &MonitorSettings) -> Result<(Arc<TelegramClient>, BotUser)> {
    let telegram = Arc::new(TelegramClient::new(&config.bot_token, settings.http_timeout())?);
    let bot = telegram.get_me().await.context("cannot authenticate Telegram bot")?;
    info!(bot = ?bot.username, "Connected to Telegram");
    Ok((telegram, bot))
}

async fn run(config: Config, settings: MonitorSettings) -> Result<()> {
    let Connections { gitlab, project, .. } = connect_gitlab(&config, &settings).await?;
    let (telegram, bot) = connect_telegram(&config, &settings).await?;
    if config.webhook_secret.is_some() {
        info!("WEBHOOK_SECRET is set but unused in polling mode");
    }

    let state = MonitorState::shared();
    let sink = ThrottledSink::new(
        TelegramChannel::new(telegram.clone(), config.chat_id.clone()),
        settings.send_interval(),
    );
    let poller = Poller::new(Arc::new(gitlab), Arc::new(sink), state.clone(), settings.clone(), &project.name);

    if settings.seed_members {
        if let Err(e) = poller.seed_members().await {
            warn!(error = %e, "Failed to load project members");
        }
    }

    let listener = CommandListener::new(
        telegram,
        state,
        CommandContext {
            project_name: project.name.clone(),
            gitlab_url: config.gitlab_url.clone(),
            settings: settings.clone(),
        },
        bot.username,
    );

    info!(chat_id = %config.chat_id, inactivity_days = settings.inactivity_days, "Bot started");

    let mut poller_task = tokio::spawn(poller.run());
    let mut listener_task = tokio::spawn(listener.run());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
        result = &mut poller_task => {
            error!(result = ?result, "Poller task exited unexpectedly");
        }
        result = &mut listener_task => {
            error!(result = ?result, "Command listener exited unexpectedly");
        }
    }

    poller_task.abort();
    listener_task.abort();
    Ok(())
}

async fn check(config: Config, settings: MonitorSettings, json: bool) -> Result<()> {
    let Connections { user, project, .. } = connect_gitlab(&config, &settings).await?;
    let (_, bot) = connect_telegram(&config, &settings).await?;

    let report = CheckReport {
        gitlab_url: config.gitlab_url.clone(),
        gitlab_user: user.username,
        project,
        bot: bot.username,
        chat_id: config.chat_id.clone(),
        webhook_secret_set: config.webhook_secret.is_some(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("✅ Configuration OK");
        println!("  GitLab:  {} (as {})", report.gitlab_url, report.gitlab_user);
        println!("  Project: {} [{}]", report.project.name, report.project.path_with_namespace);
        println!("  Bot:     @{}", report.bot.as_deref().unwrap_or("?"));
        println!("  Chat:    {}", report.chat_id);
    }
    Ok(())
}

async fn poll_once(config: Config, settings: MonitorSettings, dry_run: bool) -> Result<()> {
    let Connections { gitlab, project, .. } = connect_gitlab(&config, &settings).await?;

    let sink: Arc<dyn NotificationSink> = if dry_run {
        Arc::new(StdoutChannel::new())
    } else {
        let (telegram, _) = connect_telegram(&config, &settings).await?;
        Arc::new(ThrottledSink::new(
            TelegramChannel::new(telegram, config.chat_id.clone()),
            settings.send_interval(),
        ))
    };

    let mut poller = Poller::new(Arc::new(gitlab), sink, MonitorState::shared(), settings, &project.name);
    let report = poller.run_cycle().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug gam run
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gitlab_activity_monitor=info,gam=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    let settings = MonitorSettings::load();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config, settings).await?,
        Commands::Check { json } => check(config, settings, json).await?,
        Commands::PollOnce { dry_run } => poll_once(config, settings, dry_run).await?,
    }

    Ok(())
}
