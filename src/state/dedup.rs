//! 事件去重缓存 - 防止跨轮询周期重复通知
//!
//! 每种事件类型维护独立的 "已见" 集合，按插入顺序记录。
//! 裁剪时丢弃最早插入的条目（FIFO，而非 LRU）。

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// 默认每类事件保留的最大条目数
pub const DEFAULT_MAX_ENTRIES: usize = 200;

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Commit,
    MergeRequest,
    Issue,
    Pipeline,
}

impl EventKind {
    /// 轮询顺序
    pub const ALL: [EventKind; 4] = [
        EventKind::Commit,
        EventKind::MergeRequest,
        EventKind::Issue,
        EventKind::Pipeline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Commit => "commit",
            EventKind::MergeRequest => "merge_request",
            EventKind::Issue => "issue",
            EventKind::Pipeline => "pipeline",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline 的去重键包含状态，状态变化会产生新的键
pub fn pipeline_key(pipeline_id: u64, status: &str) -> String {
    format!("{}:{}", pipeline_id, status)
}

/// 单个事件类型的缓存
#[derive(Debug, Default)]
struct KindCache {
    /// 插入顺序
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl KindCache {
    fn insert(&mut self, id: String) -> bool {
        if self.seen.contains(&id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.order.push_back(id);
        true
    }

    fn trim(&mut self, max_size: usize) -> usize {
        let excess = self.order.len().saturating_sub(max_size);
        for _ in 0..excess {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        excess
    }
}

/// 去重缓存
#[derive(Debug, Default)]
pub struct DedupCache {
    caches: HashMap<EventKind, KindCache>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 检查事件是否已见过
    pub fn has_seen(&self, kind: EventKind, id: &str) -> bool {
        self.caches
            .get(&kind)
            .map(|cache| cache.seen.contains(id))
            .unwrap_or(false)
    }

    /// 标记事件为已见
    ///
    /// 返回 `true` 表示这是第一次见到该事件
    pub fn mark_seen(&mut self, kind: EventKind, id: impl Into<String>) -> bool {
        self.caches.entry(kind).or_default().insert(id.into())
    }

    /// 将某类事件裁剪到 `max_size` 条，返回删除数量
    pub fn trim(&mut self, kind: EventKind, max_size: usize) -> usize {
        self.caches
            .get_mut(&kind)
            .map(|cache| cache.trim(max_size))
            .unwrap_or(0)
    }

    /// 裁剪所有事件类型
    pub fn trim_all(&mut self, max_size: usize) -> usize {
        EventKind::ALL
            .iter()
            .map(|kind| self.trim(*kind, max_size))
            .sum()
    }

    pub fn len(&self, kind: EventKind) -> usize {
        self.caches.get(&kind).map(|c| c.order.len()).unwrap_or(0)
    }

    /// 所有类型的条目总数（/status 命令使用）
    pub fn total_len(&self) -> usize {
        self.caches.values().map(|c| c.order.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }
}
