//! 错误捕获管线
//!
//! 一次原始错误对每块启用捕获的看板独立处理：
//! 控制台/状态码过滤 → 原子去重落库 → 新 occurrence 且策略开启时
//! 一次性物化工单。单块看板的失败只记日志，不影响其他看板；
//! occurrence 是"错误发生过"的权威记录，建单失败不回滚它。

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::capture::identity::ErrorIdentity;
use crate::clock::Clock;
use crate::db::repository::{capture_policy, occurrence, ticket};
use crate::utils::AppResult;
use crate::utils::validation::{MAX_MESSAGE_LEN, MAX_TITLE_LEN, truncate_chars};
use shared::models::{
    CaptureContext, CapturedError, ErrorCapturePolicy, ErrorOccurrence, SampleContext,
    TicketCreate,
};

/// Error capture pipeline
pub struct CapturePipeline {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    /// 无认证上下文时记录的系统操作者
    system_actor_id: i64,
}

impl CapturePipeline {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, system_actor_id: i64) -> Self {
        Self {
            pool,
            clock,
            system_actor_id,
        }
    }

    /// 捕获一次原始错误
    ///
    /// 返回第一块看板产出的 occurrence（便利值——同一错误可能合法地
    /// 扇出到多块看板）。
    pub async fn capture(
        &self,
        error: &CapturedError,
        ctx: &CaptureContext,
    ) -> AppResult<Option<ErrorOccurrence>> {
        let error_hash = ErrorIdentity::of(error).fingerprint();
        let policies = capture_policy::find_enabled(&self.pool).await?;

        let mut first: Option<ErrorOccurrence> = None;

        for policy in policies {
            if ctx.from_console && !policy.capture_console {
                tracing::trace!(
                    board_id = policy.board_id,
                    "Console error skipped by policy"
                );
                continue;
            }
            if !policy.captures_status(error.http_status) {
                continue;
            }

            let now = self.clock.now_millis();
            let sample = self.build_sample(error, ctx, &policy, now);
            let message = truncate_chars(&error.message, MAX_MESSAGE_LEN);

            let outcome = match occurrence::record_sighting(
                &self.pool,
                policy.board_id,
                &error_hash,
                error,
                &message,
                &sample,
                policy.window_millis(),
                now,
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    // 单块看板失败不中断扇出
                    tracing::error!(
                        board_id = policy.board_id,
                        error_hash = %error_hash,
                        error = %e,
                        "Failed to record occurrence, skipping board"
                    );
                    continue;
                }
            };

            if outcome.is_new() {
                tracing::info!(
                    board_id = policy.board_id,
                    occurrence_id = outcome.occurrence().id,
                    exception = %error.exception_class,
                    "New error occurrence recorded"
                );
                if policy.auto_create_ticket
                    && let Err(e) = self.materialize_ticket(&policy, outcome.occurrence()).await
                {
                    // occurrence 已落库，是权威记录；建单失败只留痕
                    tracing::error!(
                        occurrence_id = outcome.occurrence().id,
                        error = %e,
                        "Ticket materialization failed; occurrence retained"
                    );
                }
            } else {
                tracing::debug!(
                    board_id = policy.board_id,
                    occurrence_id = outcome.occurrence().id,
                    count = outcome.occurrence().occurrence_count,
                    "Repeat error occurrence"
                );
            }

            if first.is_none() {
                first = Some(outcome.into_occurrence());
            }
        }

        Ok(first)
    }

    /// 构造采样上下文（堆栈按策略截断，最新采样覆盖旧值）
    fn build_sample(
        &self,
        error: &CapturedError,
        ctx: &CaptureContext,
        policy: &ErrorCapturePolicy,
        now: i64,
    ) -> SampleContext {
        let stack_frames = if policy.include_stack_trace {
            error
                .stack_frames
                .iter()
                .take(policy.max_stack_frames.max(0) as usize)
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        SampleContext {
            url: ctx.url.clone(),
            method: ctx.method.clone(),
            actor_id: ctx.actor_id.or(Some(self.system_actor_id)),
            stack_frames,
            captured_at: now,
        }
    }

    /// 新 occurrence 物化为工单（每个 occurrence 至多一次）
    async fn materialize_ticket(
        &self,
        policy: &ErrorCapturePolicy,
        occ: &ErrorOccurrence,
    ) -> AppResult<()> {
        let priority = policy.priority_for(occ.http_status.map(|s| s as u16));
        let data = TicketCreate {
            board_id: policy.board_id,
            title: build_title(occ),
            body: build_body(occ),
            priority,
            origin_occurrence_id: Some(occ.id),
        };

        let now = self.clock.now_millis();
        let created = ticket::create(&self.pool, data, now).await?;
        occurrence::link_ticket(&self.pool, occ.id, created.id).await?;

        tracing::info!(
            ticket_id = created.id,
            occurrence_id = occ.id,
            priority = %priority,
            "Ticket materialized from error occurrence"
        );
        Ok(())
    }
}

/// 异常类名的短名（去掉命名空间前缀）
fn short_exception_name(class: &str) -> &str {
    class
        .rsplit(|c: char| c == ':' || c == '.' || c == '\\' || c == '/')
        .next()
        .unwrap_or(class)
}

/// 标题：状态码 + 短类名 + 截断消息
fn build_title(occ: &ErrorOccurrence) -> String {
    let short = short_exception_name(&occ.exception_class);
    let title = match occ.http_status {
        Some(status) => format!("[{}] {}: {}", status, short, occ.message),
        None => format!("{}: {}", short, occ.message),
    };
    truncate_chars(&title, MAX_TITLE_LEN)
}

/// 正文：类名、消息、源位置、首次出现时间
fn build_body(occ: &ErrorOccurrence) -> String {
    let location = match (&occ.file_path, occ.line_number) {
        (Some(file), Some(line)) => format!("{}:{}", file, line),
        (Some(file), None) => file.clone(),
        _ => "unknown".to_string(),
    };
    let first_seen = chrono::DateTime::from_timestamp_millis(occ.first_seen_at)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| occ.first_seen_at.to_string());

    format!(
        "Exception: {}\nMessage: {}\nLocation: {}\nFirst seen: {}",
        occ.exception_class, occ.message, location, first_seen
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OccurrenceStatus;

    fn occurrence(status: Option<i64>, message: &str) -> ErrorOccurrence {
        ErrorOccurrence {
            id: 1,
            board_id: 1,
            ticket_id: None,
            error_hash: "abc".to_string(),
            exception_class: "App\\Jobs\\ImportFailed".to_string(),
            message: message.to_string(),
            file_path: Some("app/jobs/import.rb".to_string()),
            line_number: Some(88),
            http_status: status,
            occurrence_count: 1,
            first_seen_at: 0,
            last_seen_at: 0,
            status: OccurrenceStatus::Open,
            sample_context: SampleContext::default(),
            resolved_by: None,
            resolved_at: None,
        }
    }

    #[test]
    fn short_name_strips_namespaces() {
        assert_eq!(short_exception_name("App\\Db\\Timeout"), "Timeout");
        assert_eq!(short_exception_name("app.db.Timeout"), "Timeout");
        assert_eq!(short_exception_name("db::pool::Timeout"), "Timeout");
        assert_eq!(short_exception_name("Timeout"), "Timeout");
    }

    #[test]
    fn title_includes_status_when_present() {
        let with_status = occurrence(Some(500), "boom");
        assert_eq!(build_title(&with_status), "[500] ImportFailed: boom");

        let without = occurrence(None, "boom");
        assert_eq!(build_title(&without), "ImportFailed: boom");
    }

    #[test]
    fn title_is_truncated() {
        let long = occurrence(Some(500), &"x".repeat(400));
        assert_eq!(build_title(&long).chars().count(), MAX_TITLE_LEN);
    }

    #[test]
    fn body_carries_location_and_first_seen() {
        let occ = occurrence(Some(500), "boom");
        let body = build_body(&occ);
        assert!(body.contains("app/jobs/import.rb:88"));
        assert!(body.contains("App\\Jobs\\ImportFailed"));
        assert!(body.contains("First seen: 1970-01-01"));
    }
}
