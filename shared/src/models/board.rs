//! Board Model (看板)
//!
//! 只读协作方视图：引擎只需要通知对象和 SLA 绑定。

use serde::{Deserialize, Serialize};

/// Board record — read-only to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Board {
    pub id: i64,
    pub name: String,
    /// 看板负责人（升级通知的第一接收人）
    pub owner_id: i64,
    /// 组长（存在时同样接收升级通知）
    pub team_lead_id: Option<i64>,
    /// 绑定的 SLA 策略
    pub sla_policy_id: Option<i64>,
    pub created_at: i64,
}
