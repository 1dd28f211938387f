//! Error Capture Policy Repository
//!
//! 只读：策略由后台配置。管线按启用状态全量拉取后在内存过滤。

use super::RepoResult;
use shared::models::ErrorCapturePolicy;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, board_id, enabled, capture_console, capture_status_codes, status_priority_map, dedupe_window_hours, auto_create_ticket, include_stack_trace, max_stack_frames, created_at";

/// 所有启用的捕获策略（一次错误会扇出到每块匹配的看板）
pub async fn find_enabled(pool: &SqlitePool) -> RepoResult<Vec<ErrorCapturePolicy>> {
    let policies = sqlx::query_as::<_, ErrorCapturePolicy>(&format!(
        "SELECT {COLUMNS} FROM error_capture_policy WHERE enabled = 1 ORDER BY board_id ASC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(policies)
}
