//! SLA Policy Model
//!
//! 响应/解决时间预算。对引擎只读；`active = false` 等同于没有策略。

use serde::{Deserialize, Serialize};

/// SLA policy record — read-only input to the escalation clock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SlaPolicy {
    pub id: i64,
    pub name: String,
    pub active: bool,
    /// 响应时间预算（小时）
    pub response_time_hours: Option<i64>,
    /// 解决时间预算（小时）
    pub resolution_time_hours: Option<i64>,
    pub created_at: i64,
}
