//! 通知网关边界
//!
//! 引擎只需要"把升级事件告知用户 X"这一个能力；投递实现（邮件/推送）
//! 在本仓库之外。对引擎而言投递是 fire-and-forget：失败记日志、
//! 记失败尝试，绝不回滚已提交的升级。

use async_trait::async_trait;
use thiserror::Error;

use shared::models::EscalationRecord;

/// 投递错误
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Notification gateway — the engine's only outbound side effect
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// 投递通道标识（写入 NotificationAttempt.channel）
    fn channel(&self) -> &'static str;

    /// 向用户投递一次升级通知
    async fn notify(
        &self,
        recipient_id: i64,
        ticket_id: i64,
        record: &EscalationRecord,
    ) -> Result<(), NotifyError>;
}

/// 结构化日志投递（默认实现——真实通道由外层系统注入）
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingGateway;

#[async_trait]
impl NotificationGateway for TracingGateway {
    fn channel(&self) -> &'static str {
        "tracing"
    }

    async fn notify(
        &self,
        recipient_id: i64,
        ticket_id: i64,
        record: &EscalationRecord,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            recipient_id,
            ticket_id,
            level = %record.level,
            reason = %record.reason,
            "Escalation notification"
        );
        Ok(())
    }
}
