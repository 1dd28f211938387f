//! Escalation types (升级状态机)
//!
//! 升级等级是封闭的有序枚举，等级比较用 `Ord`，不做字符串比较。
//! `EscalationRecord` 是 append-only 审计条目，只会被标记 resolved，
//! 永不删除。

use serde::{Deserialize, Serialize};

/// Graduated escalation severity
///
/// Ordering is semantic: `None < Warning < Escalated < Critical < Urgent`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum EscalationLevel {
    None,
    Warning,
    Escalated,
    Critical,
    Urgent,
}

impl Default for EscalationLevel {
    fn default() -> Self {
        Self::None
    }
}

impl std::fmt::Display for EscalationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Warning => "warning",
            Self::Escalated => "escalated",
            Self::Critical => "critical",
            Self::Urgent => "urgent",
        };
        write!(f, "{}", s)
    }
}

/// 单个收件人的一次投递尝试
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAttempt {
    pub recipient_id: i64,
    /// 投递通道（如 "tracing", "email"）
    pub channel: String,
    /// 发送时间（Unix 毫秒）
    pub sent_at: i64,
    pub delivered: bool,
}

/// Escalation audit record (append-only)
///
/// `escalated_by = None` 表示由扫描器自动升级。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct EscalationRecord {
    pub id: i64,
    pub ticket_id: i64,
    pub level: EscalationLevel,
    /// 升级原因（自动升级时为预算突破描述）
    pub reason: String,
    pub escalated_by: Option<i64>,
    pub escalated_at: i64,
    pub resolved_by: Option<i64>,
    pub resolved_at: Option<i64>,
    /// 投递尝试明细（提交后补记，失败不回滚升级）
    #[cfg_attr(feature = "db", sqlx(json))]
    pub notifications: Vec<NotificationAttempt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_is_semantic() {
        assert!(EscalationLevel::None < EscalationLevel::Warning);
        assert!(EscalationLevel::Warning < EscalationLevel::Escalated);
        assert!(EscalationLevel::Escalated < EscalationLevel::Critical);
        assert!(EscalationLevel::Critical < EscalationLevel::Urgent);
    }

    #[test]
    fn level_serializes_snake_case() {
        let json = serde_json::to_string(&EscalationLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
