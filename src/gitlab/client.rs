//! GitLab REST 客户端
//!
//! 通过 `PRIVATE-TOKEN` 认证，所有请求限定在单个项目内。

use super::types::{Commit, Issue, Member, MergeRequest, Pipeline, Project, User};
use super::SourceControl;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 分页请求的每页数量（GitLab 上限 100）
const PER_PAGE: u32 = 100;

/// 分页请求最多翻页数
const MAX_PAGES: u32 = 20;

#[derive(Debug, Error)]
pub enum GitlabError {
    #[error("invalid GitLab URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("GitLab request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GitLab returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// GitLab 客户端
#[derive(Debug, Clone)]
pub struct GitlabClient {
    client: Client,
    /// `<base>/api/v4/`
    api_base: Url,
    token: String,
    project_id: String,
}

impl GitlabClient {
    /// 创建客户端
    ///
    /// `base_url` 形如 `https://gitlab.com`，`project_id` 可以是数字 ID 或 `group/project`
    pub fn new(
        base_url: &str,
        token: &str,
        project_id: &str,
        timeout: Duration,
    ) -> Result<Self, GitlabError> {
        let api_base = Url::parse(&format!("{}/api/v4/", base_url.trim_end_matches('/')))
            .map_err(|e| GitlabError::InvalidUrl {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;
        if api_base.cannot_be_a_base() {
            return Err(GitlabError::InvalidUrl {
                url: base_url.to_string(),
                message: "not a base URL".to_string(),
            });
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base,
            token: token.to_string(),
            project_id: project_id.to_string(),
        })
    }

    /// 构造 API URL，每个路径段都会被转义（`group/project` 中的 `/` 变为 `%2F`）
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn project_endpoint(&self, segments: &[&str]) -> Url {
        let mut all = vec!["projects", self.project_id.as_str()];
        all.extend_from_slice(segments);
        self.endpoint(&all)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GitlabError> {
        let (value, _) = self.get_page(url).await?;
        Ok(value)
    }

    /// 请求一页，同时返回下一页页码
    async fn get_page<T: DeserializeOwned>(&self, url: Url) -> Result<(T, Option<u32>), GitlabError> {
        debug!(url = %url, "GitLab GET");
        let response = self
            .client
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitlabError::Status {
                status: status.as_u16(),
                body: truncate(&body, 300),
            });
        }

        let next_page = response
            .headers()
            .get("x-next-page")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());

        Ok((response.json().await?, next_page))
    }

    /// 跟随 `X-Next-Page` 取回所有页
    async fn get_all<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, GitlabError> {
        let mut items = Vec::new();
        let mut page = 1;

        for _ in 0..MAX_PAGES {
            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let (batch, next): (Vec<T>, Option<u32>) = self.get_page(page_url).await?;
            let empty = batch.is_empty();
            items.extend(batch);

            match next {
                Some(next) if !empty && next > page => page = next,
                _ => break,
            }
        }

        Ok(items)
    }

    /// 校验 token 并返回对应用户
    pub async fn current_user(&self) -> Result<User, GitlabError> {
        self.get_json(self.endpoint(&["user"])).await
    }

    /// 获取项目信息
    pub async fn project(&self) -> Result<Project, GitlabError> {
        self.get_json(self.project_endpoint(&[])).await
    }

    /// 认证并解析项目，启动阶段调用
    pub async fn connect(&self) -> Result<(User, Project), GitlabError> {
        let user = self.current_user().await?;
        let project = self.project().await?;
        Ok((user, project))
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

fn iso8601(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl SourceControl for GitlabClient {
    async fn commits_since(&self, since: DateTime<Utc>) -> Result<Vec<Commit>, GitlabError> {
        let mut url = self.project_endpoint(&["repository", "commits"]);
        url.query_pairs_mut().append_pair("since", &iso8601(since));
        self.get_all(url).await
    }

    async fn open_merge_requests(&self) -> Result<Vec<MergeRequest>, GitlabError> {
        let mut url = self.project_endpoint(&["merge_requests"]);
        url.query_pairs_mut()
            .append_pair("state", "opened")
            .append_pair("order_by", "created_at")
            .append_pair("sort", "desc")
            .append_pair("per_page", &PER_PAGE.to_string());
        self.get_json(url).await
    }

    async fn open_issues(&self) -> Result<Vec<Issue>, GitlabError> {
        let mut url = self.project_endpoint(&["issues"]);
        url.query_pairs_mut()
            .append_pair("state", "opened")
            .append_pair("order_by", "created_at")
            .append_pair("sort", "desc")
            .append_pair("per_page", &PER_PAGE.to_string());
        self.get_json(url).await
    }

    async fn recent_pipelines(&self, limit: u32) -> Result<Vec<Pipeline>, GitlabError> {
        let mut url = self.project_endpoint(&["pipelines"]);
        url.query_pairs_mut()
            .append_pair("order_by", "updated_at")
            .append_pair("sort", "desc")
            .append_pair("per_page", &limit.to_string());
        self.get_json(url).await
    }

    async fn project_members(&self) -> Result<Vec<Member>, GitlabError> {
        self.get_all(self.project_endpoint(&["members", "all"])).await
    }
}
