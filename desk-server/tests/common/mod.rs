//! Shared test fixtures: tempdir-backed database, seed helpers, mock gateway.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use desk_server::db::DbService;
use desk_server::notify::{NotificationGateway, NotifyError};
use shared::models::{CaptureContext, CapturedError, EscalationRecord, TicketPriority};
use shared::util::snowflake_id;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const HOUR_MS: i64 = 60 * 60 * 1000;

/// 固定的测试起始时间（2023-11-14T22:13:20Z），避免和真实时钟耦合
pub const T0: i64 = 1_700_000_000_000;

pub async fn test_db() -> (DbService, TempDir) {
    let tmp = tempfile::tempdir().expect("create tempdir");
    let path = tmp.path().join("desk.db");
    let db = DbService::new(path.to_str().expect("utf8 path"))
        .await
        .expect("open test database");
    (db, tmp)
}

pub async fn seed_sla(
    pool: &SqlitePool,
    response: Option<i64>,
    resolution: Option<i64>,
    active: bool,
) -> i64 {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO sla_policy (id, name, active, response_time_hours, resolution_time_hours, created_at) \
         VALUES (?1, 'standard', ?2, ?3, ?4, 0)",
    )
    .bind(id)
    .bind(active)
    .bind(response)
    .bind(resolution)
    .execute(pool)
    .await
    .expect("seed sla policy");
    id
}

pub async fn seed_board(
    pool: &SqlitePool,
    owner_id: i64,
    team_lead_id: Option<i64>,
    sla_policy_id: Option<i64>,
) -> i64 {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO board (id, name, owner_id, team_lead_id, sla_policy_id, created_at) \
         VALUES (?1, 'Support', ?2, ?3, ?4, 0)",
    )
    .bind(id)
    .bind(owner_id)
    .bind(team_lead_id)
    .bind(sla_policy_id)
    .execute(pool)
    .await
    .expect("seed board");
    id
}

pub async fn seed_ticket(
    pool: &SqlitePool,
    board_id: i64,
    sla_policy_id: Option<i64>,
    created_at: i64,
) -> i64 {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO ticket (id, board_id, title, body, priority, sla_policy_id, \
         escalation_level, escalation_count, completed, created_at) \
         VALUES (?1, ?2, 'Printer offline', '', 'medium', ?3, 'none', 0, 0, ?4)",
    )
    .bind(id)
    .bind(board_id)
    .bind(sla_policy_id)
    .bind(created_at)
    .execute(pool)
    .await
    .expect("seed ticket");
    id
}

pub async fn complete_ticket(pool: &SqlitePool, ticket_id: i64, now: i64) {
    sqlx::query("UPDATE ticket SET completed = 1, completed_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(ticket_id)
        .execute(pool)
        .await
        .expect("complete ticket");
}

/// Capture policy seed values (defaults mirror the schema defaults)
pub struct CapturePolicySeed {
    pub enabled: bool,
    pub capture_console: bool,
    pub codes: Vec<u16>,
    pub priority_map: HashMap<u16, TicketPriority>,
    pub window_hours: i64,
    pub auto_ticket: bool,
    pub include_stack: bool,
    pub max_frames: i64,
}

impl Default for CapturePolicySeed {
    fn default() -> Self {
        Self {
            enabled: true,
            capture_console: false,
            codes: Vec::new(),
            priority_map: HashMap::new(),
            window_hours: 24,
            auto_ticket: false,
            include_stack: true,
            max_frames: 50,
        }
    }
}

pub async fn seed_capture_policy(
    pool: &SqlitePool,
    board_id: i64,
    seed: CapturePolicySeed,
) -> i64 {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO error_capture_policy (id, board_id, enabled, capture_console, \
         capture_status_codes, status_priority_map, dedupe_window_hours, auto_create_ticket, \
         include_stack_trace, max_stack_frames, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0)",
    )
    .bind(id)
    .bind(board_id)
    .bind(seed.enabled)
    .bind(seed.capture_console)
    .bind(serde_json::to_string(&seed.codes).unwrap())
    .bind(serde_json::to_string(&seed.priority_map).unwrap())
    .bind(seed.window_hours)
    .bind(seed.auto_ticket)
    .bind(seed.include_stack)
    .bind(seed.max_frames)
    .execute(pool)
    .await
    .expect("seed capture policy");
    id
}

pub fn captured_error(class: &str, status: Option<u16>) -> CapturedError {
    CapturedError {
        exception_class: class.to_string(),
        message: "database connection timed out".to_string(),
        file_path: Some("app/db/pool.rb".to_string()),
        line_number: Some(42),
        http_status: status,
        stack_frames: vec![
            "app/db/pool.rb:42:in `checkout'".to_string(),
            "app/jobs/import.rb:12:in `perform'".to_string(),
        ],
    }
}

pub fn web_context() -> CaptureContext {
    CaptureContext {
        url: Some("/api/imports".to_string()),
        method: Some("POST".to_string()),
        actor_id: Some(1001),
        from_console: false,
    }
}

/// Recording notification gateway with switchable failure and delay
pub struct MockGateway {
    pub sent: tokio::sync::Mutex<Vec<(i64, i64)>>,
    fail: AtomicBool,
    delay_ms: u64,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            sent: tokio::sync::Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            delay_ms: 0,
        }
    }

    pub fn failing() -> Self {
        let gateway = Self::new();
        gateway.fail.store(true, Ordering::SeqCst);
        gateway
    }

    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::new()
        }
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl NotificationGateway for MockGateway {
    fn channel(&self) -> &'static str {
        "mock"
    }

    async fn notify(
        &self,
        recipient_id: i64,
        ticket_id: i64,
        _record: &EscalationRecord,
    ) -> Result<(), NotifyError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("mock channel down".to_string()));
        }
        self.sent.lock().await.push((recipient_id, ticket_id));
        Ok(())
    }
}
