//! 消息格式化模块 - 将 GitLab 事件转换为 Telegram HTML 消息
//!
//! 每条消息包含项目名、事件类型图标、作者、标题、短 ID 和链接。
//! 所有来自外部的文本都会经过 HTML 转义。

use crate::gitlab::{author_name, Commit, Issue, MergeRequest, Pipeline};
use crate::state::InactiveMember;

/// 作者未知时的占位
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// 提交短 ID 长度
const SHORT_ID_LEN: usize = 8;

/// 转义 Telegram HTML 模式下的特殊字符
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Pipeline 状态对应的图标
pub fn pipeline_emoji(status: &str) -> &'static str {
    match status {
        "success" => "✅",
        "failed" => "❌",
        "canceled" => "🚫",
        "running" => "🔄",
        "pending" => "⏳",
        "skipped" => "⏭️",
        "created" => "🆕",
        "manual" => "👤",
        _ => "🔄",
    }
}

fn short_sha(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// 消息格式化器
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    project_name: String,
}

impl MessageFormatter {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    fn project_line(&self) -> String {
        format!("📝 Project: {}", escape_html(&self.project_name))
    }

    pub fn commit(&self, commit: &Commit) -> String {
        let author = commit
            .author_name
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(UNKNOWN_AUTHOR);
        format!(
            "📦 <b>New commit</b>\n{}\n👤 Author: {}\n💬 {}\n🆔 {}\n🔗 {}",
            self.project_line(),
            escape_html(author),
            escape_html(&commit.title),
            short_sha(&commit.id),
            escape_html(&commit.web_url),
        )
    }

    pub fn merge_request(&self, mr: &MergeRequest) -> String {
        let author = author_name(mr.author.as_ref()).unwrap_or(UNKNOWN_AUTHOR);
        format!(
            "🔄 <b>New merge request</b>\n{}\n🔀 !{}: {}\n👤 {}\n🌿 {} → {}\n🔗 {}",
            self.project_line(),
            mr.iid,
            escape_html(&mr.title),
            escape_html(author),
            escape_html(&mr.source_branch),
            escape_html(&mr.target_branch),
            escape_html(&mr.web_url),
        )
    }

    pub fn issue(&self, issue: &Issue) -> String {
        let author = author_name(issue.author.as_ref()).unwrap_or(UNKNOWN_AUTHOR);
        format!(
            "🎯 <b>New issue</b>\n{}\n#{}: {}\n👤 {}\n🔗 {}",
            self.project_line(),
            issue.iid,
            escape_html(&issue.title),
            escape_html(author),
            escape_html(&issue.web_url),
        )
    }

    pub fn pipeline(&self, pipeline: &Pipeline) -> String {
        let mut message = format!(
            "{} <b>Pipeline {}</b>\n{}\n🌿 {}\n🆔 #{}",
            pipeline_emoji(&pipeline.status),
            escape_html(&pipeline.status),
            self.project_line(),
            escape_html(&pipeline.git_ref),
            pipeline.id,
        );
        if let Some(user) = author_name(pipeline.user.as_ref()) {
            message.push_str(&format!("\n👤 {}", escape_html(user)));
        }
        message.push_str(&format!("\n🔗 {}", escape_html(&pipeline.web_url)));
        message
    }

    /// 周期性不活跃检查的汇总消息
    pub fn inactivity_report(&self, members: &[InactiveMember], threshold_days: i64) -> String {
        let mut message = format!(
            "⚠️ <b>Inactive members (≥ {} days):</b>\n\n",
            threshold_days
        );
        for member in members {
            message.push_str(&format!(
                "👤 {} — {} days\n",
                escape_html(&member.identity),
                member.days_inactive
            ));
        }
        message
    }
}
