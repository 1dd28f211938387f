//! Ticket Model (工单)
//!
//! 引擎只关心工单的升级相关字段；其余字段归工单 CRUD 层所有。

use serde::{Deserialize, Serialize};

use super::escalation::EscalationLevel;

/// Ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for TicketPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        };
        write!(f, "{}", s)
    }
}

/// Ticket record — the engine's view of the ticket store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Ticket {
    pub id: i64,
    /// Owning board
    pub board_id: i64,
    pub title: String,
    pub body: String,
    pub priority: TicketPriority,
    /// SLA policy inherited from the board at creation, if any
    pub sla_policy_id: Option<i64>,
    /// 当前升级等级
    pub escalation_level: EscalationLevel,
    /// 最近一次升级时间（Unix 毫秒）
    pub last_escalated_at: Option<i64>,
    /// 单调递增的升级计数器
    pub escalation_count: i64,
    /// 由错误捕获产生的工单回指其来源 occurrence
    pub origin_occurrence_id: Option<i64>,
    pub completed: bool,
    pub completed_at: Option<i64>,
    pub created_at: i64,
}

/// Create ticket payload (engine-materialized tickets)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCreate {
    pub board_id: i64,
    pub title: String,
    pub body: String,
    pub priority: TicketPriority,
    #[serde(default)]
    pub origin_occurrence_id: Option<i64>,
}
