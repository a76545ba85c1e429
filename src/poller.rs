//! GitLab 轮询器 - 检测新事件、去重、发送通知
//!
//! 一个周期按固定顺序执行：
//! 提交 → MR → issue → pipeline → （按需）不活跃检查 → 裁剪去重缓存。
//! 单类事件的错误只记录日志，不影响后续类型；整个周期出错时退避后重试。

use crate::config::MonitorSettings;
use crate::gitlab::{author_name, SourceControl};
use crate::notification::{MessageFormatter, NotificationMessage, NotificationSink};
use crate::state::{lock_state, pipeline_key, EventKind, InactiveMember, SharedState};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

/// 一次轮询的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub commits: usize,
    pub merge_requests: usize,
    pub issues: usize,
    pub pipelines: usize,
    /// 本周期执行了不活跃检查
    pub inactivity_checked: bool,
    /// 本周期新提醒的不活跃成员数
    pub inactive: usize,
    /// 裁剪掉的缓存条目数
    pub trimmed: usize,
    /// 轮询失败的事件类型
    pub failed: Vec<EventKind>,
}

impl CycleReport {
    fn record(&mut self, kind: EventKind, count: usize) {
        match kind {
            EventKind::Commit => self.commits = count,
            EventKind::MergeRequest => self.merge_requests = count,
            EventKind::Issue => self.issues = count,
            EventKind::Pipeline => self.pipelines = count,
        }
    }

    /// 本周期新发现的事件总数
    pub fn new_events(&self) -> usize {
        self.commits + self.merge_requests + self.issues + self.pipelines
    }
}

/// 一个待处理的候选事件
struct Candidate {
    key: String,
    author: Option<String>,
    at: Option<DateTime<Utc>>,
    content: String,
}

/// GitLab 轮询器
pub struct Poller {
    source: Arc<dyn SourceControl>,
    sink: Arc<dyn NotificationSink>,
    state: SharedState,
    formatter: MessageFormatter,
    settings: MonitorSettings,
    last_inactivity_check: Instant,
}

impl Poller {
    pub fn new(
        source: Arc<dyn SourceControl>,
        sink: Arc<dyn NotificationSink>,
        state: SharedState,
        settings: MonitorSettings,
        project_name: &str,
    ) -> Self {
        Self {
            source,
            sink,
            state,
            formatter: MessageFormatter::new(project_name),
            settings,
            last_inactivity_check: Instant::now(),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// 持续轮询，直到进程退出
    pub async fn run(mut self) {
        info!(
            project = %self.formatter.project_name(),
            sink = self.sink.name(),
            interval_secs = self.settings.poll_interval_secs,
            inactivity_days = self.settings.inactivity_days,
            "Starting GitLab poller"
        );

        loop {
            let outcome = self.run_cycle().await;
            match &outcome {
                Ok(report) => {
                    if report.new_events() > 0 || report.inactive > 0 || !report.failed.is_empty() {
                        info!(
                            commits = report.commits,
                            merge_requests = report.merge_requests,
                            issues = report.issues,
                            pipelines = report.pipelines,
                            inactive = report.inactive,
                            failed = ?report.failed,
                            "Polling cycle finished"
                        );
                    } else {
                        debug!(trimmed = report.trimmed, "Polling cycle finished, nothing new");
                    }
                }
                Err(e) => {
                    error!(
                        error = %e,
                        backoff_secs = self.settings.error_backoff_secs,
                        "Polling cycle failed"
                    );
                }
            }
            sleep(self.delay_after(&outcome)).await;
        }
    }

    /// 下一个周期前的等待时间：正常为轮询间隔，出错时退避
    pub fn delay_after(&self, outcome: &Result<CycleReport>) -> Duration {
        match outcome {
            Ok(_) => self.settings.poll_interval(),
            Err(_) => self.settings.error_backoff(),
        }
    }

    /// 执行一个完整周期
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        for kind in EventKind::ALL {
            match self.poll(kind).await {
                Ok(count) => report.record(kind, count),
                Err(e) => {
                    error!(kind = %kind, error = %e, "Polling failed");
                    report.failed.push(kind);
                }
            }
        }

        if self.last_inactivity_check.elapsed() >= self.settings.inactivity_check_interval() {
            report.inactivity_checked = true;
            match self.check_inactivity(Utc::now()).await {
                Ok(members) => report.inactive = members.len(),
                Err(e) => error!(error = %e, "Inactivity check failed"),
            }
            self.last_inactivity_check = Instant::now();
        }

        report.trimmed = lock_state(&self.state)?
            .dedup
            .trim_all(self.settings.cache_max_entries);
        if report.trimmed > 0 {
            debug!(trimmed = report.trimmed, "Trimmed dedup cache");
        }

        Ok(report)
    }

    /// 轮询单类事件，返回新事件数量
    pub async fn poll(&self, kind: EventKind) -> Result<usize> {
        match kind {
            EventKind::Commit => self.poll_commits().await,
            EventKind::MergeRequest => self.poll_merge_requests().await,
            EventKind::Issue => self.poll_issues().await,
            EventKind::Pipeline => self.poll_pipelines().await,
        }
    }

    /// 提交只查询最近一个时间窗口
    pub async fn poll_commits(&self) -> Result<usize> {
        let since = Utc::now() - self.settings.commit_window();
        let commits = self.source.commits_since(since).await?;

        let candidates = commits
            .iter()
            .map(|commit| Candidate {
                key: commit.id.clone(),
                author: commit
                    .author_name
                    .clone()
                    .filter(|name| !name.trim().is_empty()),
                at: commit.created_at,
                content: self.formatter.commit(commit),
            })
            .collect();
        self.process(EventKind::Commit, candidates).await
    }

    pub async fn poll_merge_requests(&self) -> Result<usize> {
        let mrs = self.source.open_merge_requests().await?;

        let candidates = mrs
            .iter()
            .map(|mr| Candidate {
                key: mr.iid.to_string(),
                author: author_name(mr.author.as_ref()).map(str::to_string),
                at: mr.created_at,
                content: self.formatter.merge_request(mr),
            })
            .collect();
        self.process(EventKind::MergeRequest, candidates).await
    }

    pub async fn poll_issues(&self) -> Result<usize> {
        let issues = self.source.open_issues().await?;

        let candidates = issues
            .iter()
            .map(|issue| Candidate {
                key: issue.iid.to_string(),
                author: author_name(issue.author.as_ref()).map(str::to_string),
                at: issue.created_at,
                content: self.formatter.issue(issue),
            })
            .collect();
        self.process(EventKind::Issue, candidates).await
    }

    /// Pipeline 以 (id, status) 去重，状态变化会再次通知
    pub async fn poll_pipelines(&self) -> Result<usize> {
        let pipelines = self.source.recent_pipelines(self.settings.pipeline_limit).await?;

        let candidates = pipelines
            .iter()
            .map(|pipeline| Candidate {
                key: pipeline_key(pipeline.id, &pipeline.status),
                author: author_name(pipeline.user.as_ref()).map(str::to_string),
                at: pipeline.updated_at,
                content: self.formatter.pipeline(pipeline),
            })
            .collect();
        self.process(EventKind::Pipeline, candidates).await
    }

    /// 按列表顺序处理候选事件
    async fn process(&self, kind: EventKind, candidates: Vec<Candidate>) -> Result<usize> {
        let mut fresh = 0;
        for candidate in candidates {
            if self.notify_once(kind, candidate).await? {
                fresh += 1;
            }
        }
        Ok(fresh)
    }

    /// 未见过的事件：标记、更新活跃度、发送通知
    async fn notify_once(&self, kind: EventKind, candidate: Candidate) -> Result<bool> {
        let Candidate {
            key,
            author,
            at,
            content,
        } = candidate;

        {
            let mut state = lock_state(&self.state)?;
            if !state.dedup.mark_seen(kind, key.as_str()) {
                return Ok(false);
            }
            if let Some(author) = author.as_deref() {
                // 事件时间缺失或在未来时使用当前时间
                let now = Utc::now();
                let at = at.map(|t| t.min(now)).unwrap_or(now);
                state.activity.observe_activity(author, at);
            }
        }

        debug!(kind = %kind, key = %key, "New event");
        let message = NotificationMessage::event(kind, content);
        if let Err(e) = self.sink.send(&message).await {
            warn!(kind = %kind, key = %key, error = %e, "Notification not delivered");
        }
        Ok(true)
    }

    /// 不活跃检查：找出新超过阈值的成员并汇总发送一条消息
    pub async fn check_inactivity(&self, now: DateTime<Utc>) -> Result<Vec<InactiveMember>> {
        info!("Checking for inactive members");
        let threshold = self.settings.inactivity_days;
        let inactive = {
            let mut state = lock_state(&self.state)?;
            state.activity.sweep(now, threshold)
        };

        if inactive.is_empty() {
            debug!("No newly inactive members");
            return Ok(inactive);
        }

        let content = self.formatter.inactivity_report(&inactive, threshold);
        self.sink.send(&NotificationMessage::inactivity(content)).await?;
        info!(count = inactive.len(), "Sent inactive member report");
        Ok(inactive)
    }

    /// 用项目成员列表预先登记成员（无活动数据）
    pub async fn seed_members(&self) -> Result<usize> {
        let members = self.source.project_members().await?;

        let mut state = lock_state(&self.state)?;
        for member in &members {
            let identity = if member.name.trim().is_empty() {
                &member.username
            } else {
                &member.name
            };
            state.activity.register(identity);
        }
        info!(count = members.len(), "Registered project members");
        Ok(members.len())
    }
}
