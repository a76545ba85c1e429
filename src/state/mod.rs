//! 运行时内存状态：去重缓存 + 成员活跃度
//!
//! 状态只存在于进程内存中，重启后丢失。

pub mod activity;
pub mod dedup;

pub use activity::{ActivityRecord, ActivityTracker, InactiveMember, MemberActivity};
pub use dedup::{pipeline_key, DedupCache, EventKind, DEFAULT_MAX_ENTRIES};

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, MutexGuard};

/// 轮询器和命令处理共享的状态
#[derive(Debug, Default)]
pub struct MonitorState {
    pub dedup: DedupCache,
    pub activity: ActivityTracker,
}

/// 共享状态句柄
///
/// 锁只在同步代码块中持有，不跨越 `.await`
pub type SharedState = Arc<Mutex<MonitorState>>;

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedState {
        Arc::new(Mutex::new(Self::new()))
    }
}

/// 获取状态锁
pub fn lock_state(state: &SharedState) -> Result<MutexGuard<'_, MonitorState>> {
    state
        .lock()
        .map_err(|_| anyhow!("monitor state lock poisoned"))
}
