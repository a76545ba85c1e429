//! GitLab 源码平台接入

pub mod client;
pub mod types;

pub use client::{GitlabClient, GitlabError};
pub use types::{author_name, Author, Commit, Issue, Member, MergeRequest, Pipeline, Project, User};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 单个项目的事件列表来源
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// `since` 之后默认分支上的提交（所有页）
    async fn commits_since(&self, since: DateTime<Utc>) -> Result<Vec<Commit>, GitlabError>;

    /// 打开状态的 MR，按创建时间倒序
    async fn open_merge_requests(&self) -> Result<Vec<MergeRequest>, GitlabError>;

    /// 打开状态的 issue，按创建时间倒序
    async fn open_issues(&self) -> Result<Vec<Issue>, GitlabError>;

    /// 最近更新的 `limit` 条 pipeline
    async fn recent_pipelines(&self, limit: u32) -> Result<Vec<Pipeline>, GitlabError>;

    /// 项目成员（含继承自 group 的成员）
    async fn project_members(&self) -> Result<Vec<Member>, GitlabError>;
}
