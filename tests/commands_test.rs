//! 命令回复与轮询状态的联动测试

mod common;

use chrono::{Duration, Utc};
use common::{commit, issue, pipeline, poller, MockSource, RecordingSink};
use gitlab_activity_monitor::commands::{reply_text, respond, COLLECTING_DATA};
use gitlab_activity_monitor::gitlab::Member;
use gitlab_activity_monitor::state::lock_state;
use gitlab_activity_monitor::{Command, CommandContext, MonitorSettings};

fn context() -> CommandContext {
    CommandContext {
        project_name: "demo".to_string(),
        gitlab_url: "https://gitlab.example.com".to_string(),
        settings: MonitorSettings::default(),
    }
}

fn quiet_settings() -> MonitorSettings {
    MonitorSettings {
        inactivity_check_secs: 3600,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_status_reflects_polled_events() {
    let source = MockSource::new();
    let sink = RecordingSink::new();
    source.set_commits(vec![commit("c1", "Alice"), commit("c2", "Bob")]);
    source.set_pipelines(vec![pipeline(1, "running")]);
    let mut p = poller(&source, &sink, quiet_settings());
    p.run_cycle().await.unwrap();

    let reply = respond(Command::Status, &context(), p.state(), Utc::now()).unwrap();

    assert!(reply.contains("👥 Tracked members: 2"));
    assert!(reply.contains("📝 Events in cache: 3"));
}

#[tokio::test]
async fn test_members_and_inactive_before_any_activity() {
    let source = MockSource::new();
    let sink = RecordingSink::new();
    let mut p = poller(&source, &sink, quiet_settings());
    p.run_cycle().await.unwrap();

    for command in [Command::Members, Command::Inactive] {
        let reply = respond(command, &context(), p.state(), Utc::now()).unwrap();
        assert_eq!(reply, COLLECTING_DATA);
    }
}

#[tokio::test]
async fn test_members_lists_seeded_members_without_data() {
    let source = MockSource::new();
    let sink = RecordingSink::new();
    source.set_members(vec![Member {
        id: 3,
        username: "carol".to_string(),
        name: "Carol".to_string(),
    }]);
    source.set_commits(vec![commit("c1", "Alice")]);
    let mut p = poller(&source, &sink, quiet_settings());
    p.seed_members().await.unwrap();
    p.run_cycle().await.unwrap();

    let reply = respond(Command::Members, &context(), p.state(), Utc::now()).unwrap();

    let alice = reply.find("Alice").unwrap();
    let carol = reply.find("Carol").unwrap();
    assert!(alice < carol);
    assert!(reply.contains("✅ Active 0 days ago"));
    assert!(reply.contains("❌ No data"));
}

#[tokio::test]
async fn test_inactive_lists_members_already_swept() {
    let source = MockSource::new();
    let sink = RecordingSink::new();
    let mut old = issue(1, "Dave");
    old.created_at = Some(Utc::now() - Duration::days(4) - Duration::hours(1));
    source.set_issues(vec![old]);
    source.set_commits(vec![commit("c1", "Alice")]);
    let settings = MonitorSettings {
        inactivity_check_secs: 0,
        ..Default::default()
    };
    let mut p = poller(&source, &sink, settings);
    let report = p.run_cycle().await.unwrap();
    assert_eq!(report.inactive, 1);

    // 已提醒过的成员仍出现在 /inactive 中
    let reply = respond(Command::Inactive, &context(), p.state(), Utc::now()).unwrap();
    assert!(reply.contains("👤 Dave — 4 days"));
    assert!(!reply.contains("Alice"));
}

#[tokio::test]
async fn test_inactive_when_everyone_is_active() {
    let source = MockSource::new();
    let sink = RecordingSink::new();
    source.set_commits(vec![commit("c1", "Alice")]);
    let mut p = poller(&source, &sink, quiet_settings());
    p.run_cycle().await.unwrap();

    let reply = respond(Command::Inactive, &context(), p.state(), Utc::now()).unwrap();
    assert_eq!(reply, "✅ All members are active!");
}

#[tokio::test]
async fn test_reply_text_start_mentions_project() {
    let source = MockSource::new();
    let sink = RecordingSink::new();
    let p = poller(&source, &sink, quiet_settings());
    lock_state(p.state()).unwrap().activity.record_activity("alice", Utc::now());

    let reply = reply_text(Command::Start, &context(), p.state());

    assert!(reply.contains("📁 Project: demo"));
    assert!(reply.contains("/inactive"));
    assert!(reply.contains("⚠️ Inactivity threshold: 2 days"));
}

#[test]
fn test_parse_commands_from_chat_text() {
    assert_eq!(Command::parse("/members", None), Some(Command::Members));
    assert_eq!(Command::parse("/status@gam_bot", Some("gam_bot")), Some(Command::Status));
    assert_eq!(Command::parse("hello", None), None);
}
