//! 测试用的内存 GitLab 和通知出口

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gitlab_activity_monitor::gitlab::{
    Author, Commit, GitlabError, Issue, Member, MergeRequest, Pipeline, SourceControl,
};
use gitlab_activity_monitor::{EventKind, MonitorSettings, MonitorState, NotificationMessage, NotificationSink, Poller};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// 可编程的 GitLab 列表来源
#[derive(Default)]
pub struct MockSource {
    pub commits: Mutex<Vec<Commit>>,
    pub merge_requests: Mutex<Vec<MergeRequest>>,
    pub issues: Mutex<Vec<Issue>>,
    pub pipelines: Mutex<Vec<Pipeline>>,
    pub members: Mutex<Vec<Member>>,
    pub failing: Mutex<HashSet<EventKind>>,
    pub commit_since: Mutex<Vec<DateTime<Utc>>>,
    pub pipeline_limits: Mutex<Vec<u32>>,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_commits(&self, commits: Vec<Commit>) {
        *self.commits.lock().unwrap() = commits;
    }

    pub fn set_merge_requests(&self, mrs: Vec<MergeRequest>) {
        *self.merge_requests.lock().unwrap() = mrs;
    }

    pub fn set_issues(&self, issues: Vec<Issue>) {
        *self.issues.lock().unwrap() = issues;
    }

    pub fn set_pipelines(&self, pipelines: Vec<Pipeline>) {
        *self.pipelines.lock().unwrap() = pipelines;
    }

    pub fn set_members(&self, members: Vec<Member>) {
        *self.members.lock().unwrap() = members;
    }

    pub fn fail(&self, kind: EventKind) {
        self.failing.lock().unwrap().insert(kind);
    }

    fn check(&self, kind: EventKind) -> Result<(), GitlabError> {
        if self.failing.lock().unwrap().contains(&kind) {
            return Err(GitlabError::Status {
                status: 503,
                body: format!("{} listing unavailable", kind),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SourceControl for MockSource {
    async fn commits_since(&self, since: DateTime<Utc>) -> Result<Vec<Commit>, GitlabError> {
        self.commit_since.lock().unwrap().push(since);
        self.check(EventKind::Commit)?;
        Ok(self.commits.lock().unwrap().clone())
    }

    async fn open_merge_requests(&self) -> Result<Vec<MergeRequest>, GitlabError> {
        self.check(EventKind::MergeRequest)?;
        Ok(self.merge_requests.lock().unwrap().clone())
    }

    async fn open_issues(&self) -> Result<Vec<Issue>, GitlabError> {
        self.check(EventKind::Issue)?;
        Ok(self.issues.lock().unwrap().clone())
    }

    async fn recent_pipelines(&self, limit: u32) -> Result<Vec<Pipeline>, GitlabError> {
        self.pipeline_limits.lock().unwrap().push(limit);
        self.check(EventKind::Pipeline)?;
        Ok(self.pipelines.lock().unwrap().clone())
    }

    async fn project_members(&self) -> Result<Vec<Member>, GitlabError> {
        Ok(self.members.lock().unwrap().clone())
    }
}

/// 记录所有发送的消息
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<NotificationMessage>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn messages(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail {
            anyhow::bail!("chat endpoint unavailable");
        }
        Ok(())
    }
}

pub fn poller(source: &Arc<MockSource>, sink: &Arc<RecordingSink>, settings: MonitorSettings) -> Poller {
    Poller::new(
        source.clone(),
        sink.clone(),
        MonitorState::shared(),
        settings,
        "demo",
    )
}

pub fn commit(id: &str, author: &str) -> Commit {
    Commit {
        id: id.to_string(),
        short_id: id.chars().take(8).collect(),
        title: format!("commit {}", id),
        author_name: Some(author.to_string()),
        web_url: format!("https://gitlab.example.com/demo/-/commit/{}", id),
        ..Default::default()
    }
}

pub fn merge_request(iid: u64, author: &str) -> MergeRequest {
    MergeRequest {
        iid,
        title: format!("MR {}", iid),
        author: Some(Author::named(author)),
        source_branch: format!("feature-{}", iid),
        target_branch: "main".to_string(),
        web_url: format!("https://gitlab.example.com/demo/-/merge_requests/{}", iid),
        ..Default::default()
    }
}

pub fn issue(iid: u64, author: &str) -> Issue {
    Issue {
        iid,
        title: format!("Issue {}", iid),
        author: Some(Author::named(author)),
        web_url: format!("https://gitlab.example.com/demo/-/issues/{}", iid),
        ..Default::default()
    }
}

pub fn pipeline(id: u64, status: &str) -> Pipeline {
    Pipeline {
        id,
        status: status.to_string(),
        git_ref: "main".to_string(),
        web_url: format!("https://gitlab.example.com/demo/-/pipelines/{}", id),
        ..Default::default()
    }
}
