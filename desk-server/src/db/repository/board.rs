//! Board Repository
//!
//! 只读：看板归 CRUD 层所有，引擎只查询通知对象与 SLA 绑定。

use super::RepoResult;
use shared::models::Board;
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Board>> {
    let board = sqlx::query_as::<_, Board>(
        "SELECT id, name, owner_id, team_lead_id, sla_policy_id, created_at FROM board WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(board)
}
