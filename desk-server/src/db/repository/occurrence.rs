//! Error Occurrence Repository (引擎自有存储)
//!
//! find-or-create 必须原子：两个近乎同时的相同错误绝不能产生两行
//! 活跃 occurrence。`BEGIN IMMEDIATE` 先取 SQLite 写锁，单写者把
//! 同一 (board, hash) 的变更线性化；不同 hash/board 的读互不阻塞
//! (WAL)。事务外的 read-then-write 是竞态，禁止。

use super::{RepoError, RepoResult};
use crate::capture::dedup::{SightingOutcome, within_window};
use shared::models::{CapturedError, ErrorOccurrence, OccurrenceStatus, SampleContext};
use shared::util::snowflake_id;
use sqlx::{SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, board_id, ticket_id, error_hash, exception_class, message, file_path, line_number, http_status, occurrence_count, first_seen_at, last_seen_at, status, sample_context, resolved_by, resolved_at";

/// 记录一次错误目击：窗口内命中活跃行则累加，否则落一行新 occurrence
#[allow(clippy::too_many_arguments)]
pub async fn record_sighting(
    pool: &SqlitePool,
    board_id: i64,
    error_hash: &str,
    error: &CapturedError,
    message: &str,
    sample: &SampleContext,
    window_millis: i64,
    now: i64,
) -> RepoResult<SightingOutcome> {
    let mut conn = pool.acquire().await?;

    // IMMEDIATE: 进入事务即持有写锁，并发目击在此排队 (busy_timeout)
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

    let result = sighting_in_tx(
        &mut conn,
        board_id,
        error_hash,
        error,
        message,
        sample,
        window_millis,
        now,
    )
    .await;

    match result {
        Ok(outcome) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok(outcome)
        }
        Err(err) => {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            Err(err)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn sighting_in_tx(
    conn: &mut SqliteConnection,
    board_id: i64,
    error_hash: &str,
    error: &CapturedError,
    message: &str,
    sample: &SampleContext,
    window_millis: i64,
    now: i64,
) -> RepoResult<SightingOutcome> {
    let existing = sqlx::query_as::<_, ErrorOccurrence>(&format!(
        "SELECT {COLUMNS} FROM error_occurrence \
         WHERE board_id = ?1 AND error_hash = ?2 AND status IN ('open', 'acknowledged') \
         ORDER BY last_seen_at DESC LIMIT 1"
    ))
    .bind(board_id)
    .bind(error_hash)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(existing) = existing
        && within_window(existing.last_seen_at, window_millis, now)
    {
        // Repeat: 计数 +1、刷新 last_seen 与采样（最新覆盖）
        let sample_json = serde_json::to_string(sample)?;
        sqlx::query(
            "UPDATE error_occurrence SET occurrence_count = occurrence_count + 1, \
             last_seen_at = ?1, sample_context = ?2 WHERE id = ?3",
        )
        .bind(now)
        .bind(sample_json)
        .bind(existing.id)
        .execute(&mut *conn)
        .await?;

        let mut updated = existing;
        updated.occurrence_count += 1;
        updated.last_seen_at = now;
        updated.sample_context = sample.clone();
        return Ok(SightingOutcome::Repeat(updated));
    }

    // 首次目击 / 旧行过窗 / 旧行已终态：落新行
    let id = snowflake_id();
    let sample_json = serde_json::to_string(sample)?;
    sqlx::query(
        "INSERT INTO error_occurrence (id, board_id, error_hash, exception_class, message, \
         file_path, line_number, http_status, occurrence_count, first_seen_at, last_seen_at, \
         status, sample_context) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9, 'open', ?10)",
    )
    .bind(id)
    .bind(board_id)
    .bind(error_hash)
    .bind(&error.exception_class)
    .bind(message)
    .bind(&error.file_path)
    .bind(error.line_number.map(|n| n as i64))
    .bind(error.http_status.map(|s| s as i64))
    .bind(now)
    .bind(sample_json)
    .execute(&mut *conn)
    .await?;

    Ok(SightingOutcome::New(ErrorOccurrence {
        id,
        board_id,
        ticket_id: None,
        error_hash: error_hash.to_string(),
        exception_class: error.exception_class.clone(),
        message: message.to_string(),
        file_path: error.file_path.clone(),
        line_number: error.line_number.map(|n| n as i64),
        http_status: error.http_status.map(|s| s as i64),
        occurrence_count: 1,
        first_seen_at: now,
        last_seen_at: now,
        status: OccurrenceStatus::Open,
        sample_context: sample.clone(),
        resolved_by: None,
        resolved_at: None,
    }))
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<ErrorOccurrence>> {
    let occurrence = sqlx::query_as::<_, ErrorOccurrence>(&format!(
        "SELECT {COLUMNS} FROM error_occurrence WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(occurrence)
}

/// 看板内某个错误身份的全部 occurrence（新→旧）
pub async fn find_by_board_and_hash(
    pool: &SqlitePool,
    board_id: i64,
    error_hash: &str,
) -> RepoResult<Vec<ErrorOccurrence>> {
    let occurrences = sqlx::query_as::<_, ErrorOccurrence>(&format!(
        "SELECT {COLUMNS} FROM error_occurrence \
         WHERE board_id = ?1 AND error_hash = ?2 ORDER BY first_seen_at DESC, id DESC"
    ))
    .bind(board_id)
    .bind(error_hash)
    .fetch_all(pool)
    .await?;
    Ok(occurrences)
}

/// 物化建单后回填工单引用
pub async fn link_ticket(pool: &SqlitePool, occurrence_id: i64, ticket_id: i64) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE error_occurrence SET ticket_id = ?1 WHERE id = ?2")
        .bind(ticket_id)
        .bind(occurrence_id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("occurrence {occurrence_id}")));
    }
    Ok(())
}

/// open → acknowledged
pub async fn acknowledge(pool: &SqlitePool, id: i64) -> RepoResult<ErrorOccurrence> {
    transition(pool, id, OccurrenceStatus::Acknowledged, None, None).await
}

/// open|acknowledged → resolved (终态，退出去重池)
pub async fn resolve(
    pool: &SqlitePool,
    id: i64,
    actor: i64,
    now: i64,
) -> RepoResult<ErrorOccurrence> {
    transition(pool, id, OccurrenceStatus::Resolved, Some(actor), Some(now)).await
}

/// open|acknowledged → ignored (终态，退出去重池)
pub async fn ignore(
    pool: &SqlitePool,
    id: i64,
    actor: i64,
    now: i64,
) -> RepoResult<ErrorOccurrence> {
    transition(pool, id, OccurrenceStatus::Ignored, Some(actor), Some(now)).await
}

/// 人工状态流转：校验状态机约束，条件写防并发覆盖
async fn transition(
    pool: &SqlitePool,
    id: i64,
    next: OccurrenceStatus,
    actor: Option<i64>,
    now: Option<i64>,
) -> RepoResult<ErrorOccurrence> {
    let occurrence = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("occurrence {id}")))?;

    // 终态行已退出生命周期，给出比一般非法流转更明确的拒绝
    if occurrence.status.is_terminal() {
        return Err(RepoError::Validation(format!(
            "Occurrence {id} is {}, terminal states are immutable",
            occurrence.status
        )));
    }
    if !occurrence.status.can_transition_to(next) {
        return Err(RepoError::Validation(format!(
            "Cannot transition occurrence from {} to {}",
            occurrence.status, next
        )));
    }

    let rows = sqlx::query(
        "UPDATE error_occurrence SET status = ?1, resolved_by = ?2, resolved_at = ?3 \
         WHERE id = ?4 AND status = ?5",
    )
    .bind(next)
    .bind(actor)
    .bind(now)
    .bind(id)
    .bind(occurrence.status)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::Validation(format!(
            "Occurrence {id} status changed concurrently"
        )));
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("occurrence {id}")))
}
