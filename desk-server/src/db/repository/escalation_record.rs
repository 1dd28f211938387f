//! Escalation Record Repository
//!
//! Append-only 审计轨迹：只有 append、补记通知、标记 resolved，
//! 没有任何删除接口。

use super::{RepoError, RepoResult};
use shared::models::{EscalationLevel, EscalationRecord, NotificationAttempt};
use shared::util::snowflake_id;
use sqlx::{SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, ticket_id, level, reason, escalated_by, escalated_at, resolved_by, resolved_at, notifications";

/// 追加一条升级审计记录（与工单升级写同一事务）
///
/// `escalated_by = None` 表示自动升级。
pub async fn append(
    conn: &mut SqliteConnection,
    ticket_id: i64,
    level: EscalationLevel,
    reason: &str,
    escalated_by: Option<i64>,
    now: i64,
) -> RepoResult<EscalationRecord> {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO escalation_record (id, ticket_id, level, reason, escalated_by, escalated_at, notifications) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, '[]')",
    )
    .bind(id)
    .bind(ticket_id)
    .bind(level)
    .bind(reason)
    .bind(escalated_by)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(EscalationRecord {
        id,
        ticket_id,
        level,
        reason: reason.to_string(),
        escalated_by,
        escalated_at: now,
        resolved_by: None,
        resolved_at: None,
        notifications: Vec::new(),
    })
}

/// 提交后补记投递尝试（通知失败不回滚升级，只留痕）
pub async fn record_notifications(
    pool: &SqlitePool,
    record_id: i64,
    attempts: &[NotificationAttempt],
) -> RepoResult<()> {
    let json = serde_json::to_string(attempts)?;
    let rows = sqlx::query("UPDATE escalation_record SET notifications = ?1 WHERE id = ?2")
        .bind(json)
        .bind(record_id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "escalation_record {record_id}"
        )));
    }
    Ok(())
}

/// 将该工单所有未解决的记录标记为 resolved
///
/// 返回受影响的行数（0 表示没有活跃升级）。
pub async fn resolve_open(
    conn: &mut SqliteConnection,
    ticket_id: i64,
    resolved_by: Option<i64>,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE escalation_record SET resolved_by = ?1, resolved_at = ?2 \
         WHERE ticket_id = ?3 AND resolved_at IS NULL",
    )
    .bind(resolved_by)
    .bind(now)
    .bind(ticket_id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// 工单的全部升级历史（新→旧）
pub async fn find_by_ticket(
    pool: &SqlitePool,
    ticket_id: i64,
) -> RepoResult<Vec<EscalationRecord>> {
    let records = sqlx::query_as::<_, EscalationRecord>(&format!(
        "SELECT {COLUMNS} FROM escalation_record WHERE ticket_id = ? ORDER BY escalated_at DESC, id DESC"
    ))
    .bind(ticket_id)
    .fetch_all(pool)
    .await?;
    Ok(records)
}
