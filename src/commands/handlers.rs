//! 命令解析与渲染
//!
//! 所有命令都是只读的，直接读取共享状态渲染为 HTML 文本。

use crate::config::MonitorSettings;
use crate::notification::escape_html;
use crate::state::{lock_state, MonitorState, SharedState};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// /members 和 /inactive 最多显示的人数
pub const TOP_N: usize = 10;

/// 尚无活动数据时的回复
pub const COLLECTING_DATA: &str = "❌ Activity data is still being collected...";

/// 支持的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// /start 或 /help
    Start,
    Status,
    Members,
    Inactive,
}

impl Command {
    /// 解析消息文本
    ///
    /// 支持 `/cmd` 和 `/cmd@botname`；指定了其他 bot 的命令会被忽略
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        let command = first.strip_prefix('/')?;

        let name = match command.split_once('@') {
            Some((name, target)) => {
                if let Some(bot) = bot_username {
                    if !target.eq_ignore_ascii_case(bot) {
                        return None;
                    }
                }
                name
            }
            None => command,
        };

        match name.to_ascii_lowercase().as_str() {
            "start" | "help" => Some(Command::Start),
            "status" => Some(Command::Status),
            "members" => Some(Command::Members),
            "inactive" => Some(Command::Inactive),
            _ => None,
        }
    }
}

/// 渲染命令所需的静态信息
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_name: String,
    pub gitlab_url: String,
    pub settings: MonitorSettings,
}

/// 执行命令并返回回复文本
pub fn respond(command: Command, context: &CommandContext, state: &SharedState, now: DateTime<Utc>) -> Result<String> {
    let state = lock_state(state)?;
    Ok(render(command, context, &state, now))
}

/// 根据当前状态渲染回复
pub fn render(command: Command, context: &CommandContext, state: &MonitorState, now: DateTime<Utc>) -> String {
    match command {
        Command::Start => render_start(context),
        Command::Status => render_status(context, state),
        Command::Members => render_members(context, state, now),
        Command::Inactive => render_inactive(context, state, now),
    }
}

fn render_start(context: &CommandContext) -> String {
    format!(
        "👋 <b>GitLab activity monitor</b>\n\n\
         📁 Project: {}\n\
         🌐 GitLab: {}\n\n\
         ✅ Bot is running\n\
         ⏰ Polling every {} seconds\n\
         ⚠️ Inactivity threshold: {} days\n\n\
         Commands:\n\
         /status - bot status\n\
         /members - member activity\n\
         /inactive - inactive members",
        escape_html(&context.project_name),
        escape_html(&context.gitlab_url),
        context.settings.poll_interval_secs,
        context.settings.inactivity_days,
    )
}

fn render_status(context: &CommandContext, state: &MonitorState) -> String {
    format!(
        "✅ <b>Bot status</b>\n\n\
         📁 Project: {}\n\
         📊 Polling: every {} s\n\
         ⏰ Inactivity: ≥ {} days\n\
         👥 Tracked members: {}\n\
         📝 Events in cache: {}",
        escape_html(&context.project_name),
        context.settings.poll_interval_secs,
        context.settings.inactivity_days,
        state.activity.len(),
        state.dedup.total_len(),
    )
}

fn render_members(context: &CommandContext, state: &MonitorState, now: DateTime<Utc>) -> String {
    if state.activity.is_empty() {
        return COLLECTING_DATA.to_string();
    }

    let threshold = context.settings.inactivity_days;
    let mut response = String::from("👥 <b>Member activity:</b>\n\n");
    for member in state.activity.members_by_recency(TOP_N) {
        let status = match member.last_activity {
            Some(last) => {
                let days = (now - last).num_days();
                if days >= threshold {
                    format!("⚠️ Inactive for {} days", days)
                } else {
                    format!("✅ Active {} days ago", days)
                }
            }
            None => "❌ No data".to_string(),
        };
        response.push_str(&format!("👤 <b>{}</b>\n{}\n\n", escape_html(&member.identity), status));
    }
    response
}

fn render_inactive(context: &CommandContext, state: &MonitorState, now: DateTime<Utc>) -> String {
    if state.activity.is_empty() {
        return COLLECTING_DATA.to_string();
    }

    let threshold = context.settings.inactivity_days;
    let inactive = state.activity.inactive_members(now, threshold);
    if inactive.is_empty() {
        return "✅ All members are active!".to_string();
    }

    let mut response = format!("⚠️ <b>Inactive members (≥ {} days):</b>\n\n", threshold);
    for member in inactive.iter().take(TOP_N) {
        response.push_str(&format!(
            "👤 {} — {} days\n",
            escape_html(&member.identity),
            member.days_inactive
        ));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn context() -> CommandContext {
        CommandContext {
            project_name: "demo".to_string(),
            gitlab_url: "https://gitlab.example.com".to_string(),
            settings: MonitorSettings::default(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start", None), Some(Command::Start));
        assert_eq!(Command::parse("/help", None), Some(Command::Start));
        assert_eq!(Command::parse("/status extra args", None), Some(Command::Status));
        assert_eq!(Command::parse("  /MEMBERS", None), Some(Command::Members));
        assert_eq!(Command::parse("/inactive@gam_bot", Some("gam_bot")), Some(Command::Inactive));
        assert_eq!(Command::parse("/inactive@gam_bot", None), Some(Command::Inactive));
    }

    #[test]
    fn test_parse_ignores_other_text() {
        assert_eq!(Command::parse("hello", None), None);
        assert_eq!(Command::parse("", None), None);
        assert_eq!(Command::parse("/unknown", None), None);
        assert_eq!(Command::parse("/status@other_bot", Some("gam_bot")), None);
    }

    #[test]
    fn test_status_shows_cache_size() {
        let mut state = MonitorState::new();
        state.dedup.mark_seen(crate::state::EventKind::Commit, "a");
        state.dedup.mark_seen(crate::state::EventKind::Issue, "1");

        let text = render(Command::Status, &context(), &state, now());

        assert!(text.contains("📝 Events in cache: 2"));
        assert!(text.contains("📁 Project: demo"));
    }

    #[test]
    fn test_start_lists_commands() {
        let text = render(Command::Start, &context(), &MonitorState::new(), now());
        assert!(text.contains("/status"));
        assert!(text.contains("/members"));
        assert!(text.contains("/inactive"));
        assert!(text.contains("Polling every 30 seconds"));
    }

    #[test]
    fn test_empty_tracker_is_collecting() {
        let state = MonitorState::new();
        assert_eq!(render(Command::Members, &context(), &state, now()), COLLECTING_DATA);
        assert_eq!(render(Command::Inactive, &context(), &state, now()), COLLECTING_DATA);
    }

    #[test]
    fn test_members_sorted_and_labelled() {
        let mut state = MonitorState::new();
        state.activity.record_activity("recent", now() - Duration::hours(2));
        state.activity.record_activity("stale", now() - Duration::days(4));
        state.activity.register("newcomer");

        let text = render(Command::Members, &context(), &state, now());

        let recent = text.find("recent").unwrap();
        let stale = text.find("stale").unwrap();
        let newcomer = text.find("newcomer").unwrap();
        assert!(recent < stale && stale < newcomer);
        assert!(text.contains("✅ Active 0 days ago"));
        assert!(text.contains("⚠️ Inactive for 4 days"));
        assert!(text.contains("❌ No data"));
    }

    #[test]
    fn test_members_truncated_to_top_n() {
        let mut state = MonitorState::new();
        for i in 0..15 {
            state
                .activity
                .record_activity(&format!("user{:02}", i), now() - Duration::hours(i));
        }

        let text = render(Command::Members, &context(), &state, now());

        assert_eq!(text.matches("👤").count(), TOP_N);
        assert!(text.contains("user00"));
        assert!(!text.contains("user14"));
    }

    #[test]
    fn test_inactive_lists_all_past_threshold() {
        let mut state = MonitorState::new();
        state.activity.record_activity("alice", now() - Duration::days(3));
        state.activity.record_activity("bob", now() - Duration::hours(1));
        // 已经提醒过的成员仍然显示
        state.activity.sweep(now(), 2);

        let text = render(Command::Inactive, &context(), &state, now());

        assert!(text.contains("👤 alice — 3 days"));
        assert!(!text.contains("bob"));
    }

    #[test]
    fn test_inactive_all_active() {
        let mut state = MonitorState::new();
        state.activity.record_activity("bob", now());

        let text = render(Command::Inactive, &context(), &state, now());
        assert_eq!(text, "✅ All members are active!");
    }

    #[test]
    fn test_respond_uses_shared_state() {
        let shared = MonitorState::shared();
        lock_state(&shared).unwrap().activity.record_activity("alice", now());

        let text = respond(Command::Members, &context(), &shared, now()).unwrap();
        assert!(text.contains("alice"));
    }
}
