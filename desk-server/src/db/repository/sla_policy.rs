//! SLA Policy Repository
//!
//! 只读：策略值由后台配置，引擎消费。查不到不是错误——
//! 等同于该工单没有升级语义。

use super::RepoResult;
use shared::models::SlaPolicy;
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<SlaPolicy>> {
    let policy = sqlx::query_as::<_, SlaPolicy>(
        "SELECT id, name, active, response_time_hours, resolution_time_hours, created_at FROM sla_policy WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(policy)
}
