//! Ticket Repository
//!
//! 引擎对工单存储的视图：扫描查询、升级字段的条件写、
//! 以及错误物化建单。其余工单字段归 CRUD 层所有。

use super::{RepoError, RepoResult};
use shared::models::{EscalationLevel, Ticket, TicketCreate};
use shared::util::snowflake_id;
use sqlx::{SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, board_id, title, body, priority, sla_policy_id, escalation_level, last_escalated_at, escalation_count, origin_occurrence_id, completed, completed_at, created_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Ticket>> {
    let ticket =
        sqlx::query_as::<_, Ticket>(&format!("SELECT {COLUMNS} FROM ticket WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(ticket)
}

/// 扫描集：未完结且绑定了活跃 SLA 策略的工单
pub async fn find_open_with_active_sla(pool: &SqlitePool) -> RepoResult<Vec<Ticket>> {
    let tickets = sqlx::query_as::<_, Ticket>(
        "SELECT t.id, t.board_id, t.title, t.body, t.priority, t.sla_policy_id, \
         t.escalation_level, t.last_escalated_at, t.escalation_count, \
         t.origin_occurrence_id, t.completed, t.completed_at, t.created_at \
         FROM ticket t \
         JOIN sla_policy s ON s.id = t.sla_policy_id \
         WHERE t.completed = 0 AND s.active = 1 \
         ORDER BY t.created_at ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(tickets)
}

/// 条件升级写：仅当工单仍处于 `from` 等级时生效
///
/// 返回 false 表示另一次扫描已经完成了同一迁移（重叠运行无害化）。
/// 写语句是事务的第一条语句，使事务立即持有写锁。
pub async fn apply_escalation(
    conn: &mut SqliteConnection,
    ticket_id: i64,
    from: EscalationLevel,
    to: EscalationLevel,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE ticket SET escalation_level = ?1, last_escalated_at = ?2, \
         escalation_count = escalation_count + 1 \
         WHERE id = ?3 AND escalation_level = ?4 AND completed = 0",
    )
    .bind(to)
    .bind(now)
    .bind(ticket_id)
    .bind(from)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// 升级解除：回到 `none` 并清空最近升级时间（计数器保留）
pub async fn reset_escalation(conn: &mut SqliteConnection, ticket_id: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE ticket SET escalation_level = 'none', last_escalated_at = NULL WHERE id = ?",
    )
    .bind(ticket_id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// 创建工单（错误物化路径）
///
/// SLA 策略从所属看板继承。
pub async fn create(pool: &SqlitePool, data: TicketCreate, now: i64) -> RepoResult<Ticket> {
    let sla_policy_id: Option<i64> =
        sqlx::query_scalar("SELECT sla_policy_id FROM board WHERE id = ?")
            .bind(data.board_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("board {}", data.board_id)))?;

    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO ticket (id, board_id, title, body, priority, sla_policy_id, \
         escalation_level, escalation_count, origin_occurrence_id, completed, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'none', 0, ?7, 0, ?8)",
    )
    .bind(id)
    .bind(data.board_id)
    .bind(&data.title)
    .bind(&data.body)
    .bind(data.priority)
    .bind(sla_policy_id)
    .bind(data.origin_occurrence_id)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create ticket".into()))
}
