//! 成员活跃度追踪
//!
//! 记录每个贡献者最近一次活动时间，以及是否已经发送过不活跃提醒。
//! `notified` 是一个闩锁：发送提醒后置位，新活动或重新回到阈值以内时复位。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// 单个贡献者的活跃记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityRecord {
    /// 最近一次活动时间，None 表示尚无数据
    pub last_activity: Option<DateTime<Utc>>,
    /// 是否已发送不活跃提醒
    pub notified: bool,
}

impl ActivityRecord {
    /// 距今不活跃的整天数
    pub fn days_inactive(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_activity.map(|last| (now - last).num_days())
    }
}

/// 不活跃成员
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InactiveMember {
    pub identity: String,
    pub days_inactive: i64,
}

/// 按最近活跃排序的成员视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberActivity {
    pub identity: String,
    pub last_activity: Option<DateTime<Utc>>,
}

/// 活跃度追踪器
#[derive(Debug, Default)]
pub struct ActivityTracker {
    records: HashMap<String, ActivityRecord>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次活动（后写入者生效，不检查时间先后）
    pub fn record_activity(&mut self, identity: &str, timestamp: DateTime<Utc>) {
        let record = self.records.entry(identity.to_string()).or_default();
        record.last_activity = Some(timestamp);
        record.notified = false;
    }

    /// 记录一次观察到的活动，只在时间更新时才前移
    ///
    /// 轮询按事件类型依次处理，旧事件可能晚于新事件被看到；
    /// 返回 `true` 表示记录被更新
    pub fn observe_activity(&mut self, identity: &str, timestamp: DateTime<Utc>) -> bool {
        let newer = match self.records.get(identity).and_then(|r| r.last_activity) {
            Some(last) => timestamp > last,
            None => true,
        };
        if newer {
            self.record_activity(identity, timestamp);
        }
        newer
    }

    /// 登记一个尚无活动数据的成员
    pub fn register(&mut self, identity: &str) {
        self.records.entry(identity.to_string()).or_default();
    }

    pub fn get(&self, identity: &str) -> Option<&ActivityRecord> {
        self.records.get(identity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 计算需要提醒的不活跃成员（只读）
    ///
    /// 条件：有活动记录、不活跃天数 >= 阈值、尚未提醒
    pub fn compute_inactive(&self, now: DateTime<Utc>, threshold_days: i64) -> Vec<InactiveMember> {
        let mut inactive: Vec<InactiveMember> = self
            .records
            .iter()
            .filter(|(_, record)| !record.notified)
            .filter_map(|(identity, record)| {
                let days = record.days_inactive(now)?;
                (days >= threshold_days).then(|| InactiveMember {
                    identity: identity.clone(),
                    days_inactive: days,
                })
            })
            .collect();
        sort_by_days_desc(&mut inactive);
        inactive
    }

    /// 周期性检查：返回新的不活跃成员并置位提醒标记
    ///
    /// 已提醒但重新回到阈值以内的成员会被复位，以便将来再次提醒
    pub fn sweep(&mut self, now: DateTime<Utc>, threshold_days: i64) -> Vec<InactiveMember> {
        let mut inactive = Vec::new();

        for (identity, record) in self.records.iter_mut() {
            let Some(days) = record.days_inactive(now) else {
                continue;
            };
            if days >= threshold_days && !record.notified {
                record.notified = true;
                inactive.push(InactiveMember {
                    identity: identity.clone(),
                    days_inactive: days,
                });
            } else if days < threshold_days && record.notified {
                record.notified = false;
            }
        }

        sort_by_days_desc(&mut inactive);
        inactive
    }

    /// 所有超过阈值的成员，忽略提醒标记（/inactive 命令使用）
    pub fn inactive_members(&self, now: DateTime<Utc>, threshold_days: i64) -> Vec<InactiveMember> {
        let mut inactive: Vec<InactiveMember> = self
            .records
            .iter()
            .filter_map(|(identity, record)| {
                let days = record.days_inactive(now)?;
                (days >= threshold_days).then(|| InactiveMember {
                    identity: identity.clone(),
                    days_inactive: days,
                })
            })
            .collect();
        sort_by_days_desc(&mut inactive);
        inactive
    }

    /// 按最近活跃时间倒序，无数据的成员排在最后
    pub fn members_by_recency(&self, limit: usize) -> Vec<MemberActivity> {
        let mut members: Vec<MemberActivity> = self
            .records
            .iter()
            .map(|(identity, record)| MemberActivity {
                identity: identity.clone(),
                last_activity: record.last_activity,
            })
            .collect();

        // Option 排序中 None < Some，倒序后无数据自然排在最后
        members.sort_by(|a, b| {
            b.last_activity
                .cmp(&a.last_activity)
                .then_with(|| a.identity.cmp(&b.identity))
        });
        members.truncate(limit);
        members
    }
}

fn sort_by_days_desc(members: &mut [InactiveMember]) {
    members.sort_by(|a, b| {
        b.days_inactive
            .cmp(&a.days_inactive)
            .then_with(|| a.identity.cmp(&b.identity))
    });
}
