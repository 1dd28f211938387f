//! 升级扫描器
//!
//! 周期性扫描未完结、绑定活跃 SLA 的工单：
//! 1. 纯时钟算出应处等级；等级未变是常态，直接跳过（幂等）
//! 2. 等级变化时在单个事务内完成：条件更新工单 + 追加审计记录
//! 3. 事务提交后才投递通知——慢通道永远不会拖住状态正确性
//! 4. 单个工单失败只记日志，整轮扫描绝不因一条坏记录中止
//!
//! 重叠运行：run_lock try_lock 串行化；即使串行化失效，条件写也会
//! 把重复迁移变成无害 no-op。

use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::db::repository::{board, escalation_record, sla_policy, ticket};
use crate::escalation::clock::{self, ThresholdTable};
use crate::notify::NotificationGateway;
use crate::utils::AppResult;
use crate::utils::validation::{MAX_REASON_LEN, validate_required_text};
use shared::error::{AppError, ErrorCode};
use shared::models::{EscalationLevel, EscalationRecord, NotificationAttempt, Ticket};

/// 一轮扫描的统计
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct SweepReport {
    /// 本轮检视的工单数
    pub scanned: usize,
    /// 完成等级迁移的工单数
    pub escalated: usize,
    /// 失败（已记日志、继续）的工单数
    pub failed: usize,
    /// 是否因超过截止时间提前收尾
    pub deadline_hit: bool,
    /// 是否因与上一轮重叠而直接跳过
    pub skipped_overlap: bool,
}

/// Escalation sweeper
pub struct EscalationSweeper {
    pool: SqlitePool,
    gateway: Arc<dyn NotificationGateway>,
    clock: Arc<dyn Clock>,
    thresholds: ThresholdTable,
    /// 单轮扫描的最长运行时间
    deadline: Duration,
    /// 串行化扫描轮次（重叠触发直接跳过）
    run_lock: tokio::sync::Mutex<()>,
}

impl EscalationSweeper {
    pub fn new(
        pool: SqlitePool,
        gateway: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
        thresholds: ThresholdTable,
        deadline: Duration,
    ) -> Self {
        Self {
            pool,
            gateway,
            clock,
            thresholds,
            deadline,
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// 执行一轮扫描
    pub async fn run_once(&self) -> SweepReport {
        let Ok(_guard) = self.run_lock.try_lock() else {
            tracing::debug!("Previous sweep still running, skipping overlapping trigger");
            return SweepReport {
                skipped_overlap: true,
                ..Default::default()
            };
        };

        let started = Instant::now();
        let mut report = SweepReport::default();

        let tickets = match ticket::find_open_with_active_sla(&self.pool).await {
            Ok(tickets) => tickets,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load sweep candidates");
                report.failed = 1;
                return report;
            }
        };

        for t in tickets {
            if started.elapsed() > self.deadline {
                // 干净收尾：当前工单已完成，剩余的留给下一轮
                tracing::warn!(
                    scanned = report.scanned,
                    "Sweep deadline exceeded, finishing early"
                );
                report.deadline_hit = true;
                break;
            }

            report.scanned += 1;
            match self.sweep_ticket(&t).await {
                Ok(true) => report.escalated += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        ticket_id = t.id,
                        error = %e,
                        "Ticket sweep failed, continuing"
                    );
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            escalated = report.escalated,
            failed = report.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Escalation sweep finished"
        );
        report
    }

    /// 单个工单：算等级 → 无变化即止 → 变化则迁移 + 通知
    async fn sweep_ticket(&self, t: &Ticket) -> AppResult<bool> {
        // SLA 查不到不是错误——该工单此刻没有升级语义
        let policy = match t.sla_policy_id {
            Some(id) => sla_policy::find_by_id(&self.pool, id).await?,
            None => None,
        };

        let now = self.clock.now_millis();
        let new_level = clock::level_for(
            policy.as_ref(),
            t.created_at,
            t.completed,
            now,
            &self.thresholds,
        );

        if new_level == t.escalation_level {
            return Ok(false);
        }

        let remaining = clock::remaining_hours(policy.as_ref(), t.created_at, t.completed, now);
        let reason = clock::breach_summary(remaining);

        let Some(record) = self
            .apply_transition(t.id, t.escalation_level, new_level, &reason, None, now)
            .await?
        else {
            // 另一轮扫描抢先完成了同一迁移
            return Ok(false);
        };

        tracing::info!(
            ticket_id = t.id,
            from = %t.escalation_level,
            to = %new_level,
            reason = %reason,
            "Ticket escalated"
        );

        self.dispatch_notifications(t, &record).await;
        Ok(true)
    }

    /// 等级迁移的原子单元：条件更新工单 + 追加审计记录
    ///
    /// 返回 None 表示条件写未命中（并发迁移已发生），调用方按 no-op 处理。
    async fn apply_transition(
        &self,
        ticket_id: i64,
        from: EscalationLevel,
        to: EscalationLevel,
        reason: &str,
        actor: Option<i64>,
        now: i64,
    ) -> AppResult<Option<EscalationRecord>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::database(format!("Failed to begin escalation transaction: {e}"))
        })?;

        let updated = ticket::apply_escalation(&mut *tx, ticket_id, from, to, now).await?;
        if !updated {
            tx.rollback()
                .await
                .map_err(|e| AppError::database(e.to_string()))?;
            return Ok(None);
        }

        let record = escalation_record::append(&mut *tx, ticket_id, to, reason, actor, now).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit escalation: {e}")))?;
        Ok(Some(record))
    }

    /// 通知看板负责人与组长（提交之后；失败只留痕）
    async fn dispatch_notifications(&self, t: &Ticket, record: &EscalationRecord) {
        let board = match board::find_by_id(&self.pool, t.board_id).await {
            Ok(Some(board)) => board,
            Ok(None) => {
                tracing::warn!(
                    ticket_id = t.id,
                    board_id = t.board_id,
                    "Board missing, escalation notifications skipped"
                );
                return;
            }
            Err(e) => {
                tracing::error!(
                    ticket_id = t.id,
                    error = %e,
                    "Board lookup failed, escalation notifications skipped"
                );
                return;
            }
        };

        let mut recipients = vec![board.owner_id];
        if let Some(lead) = board.team_lead_id
            && lead != board.owner_id
        {
            recipients.push(lead);
        }

        let mut attempts = Vec::with_capacity(recipients.len());
        for recipient_id in recipients {
            let delivered = match self.gateway.notify(recipient_id, t.id, record).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        ticket_id = t.id,
                        recipient_id,
                        error = %e,
                        "Escalation notification failed"
                    );
                    false
                }
            };
            attempts.push(NotificationAttempt {
                recipient_id,
                channel: self.gateway.channel().to_string(),
                sent_at: self.clock.now_millis(),
                delivered,
            });
        }

        if let Err(e) =
            escalation_record::record_notifications(&self.pool, record.id, &attempts).await
        {
            tracing::error!(
                record_id = record.id,
                error = %e,
                "Failed to record notification attempts"
            );
        }
    }

    /// 人工升级：绕过时钟，同一落库路径，必须有操作者和理由
    pub async fn escalate_manual(
        &self,
        ticket_id: i64,
        level: EscalationLevel,
        reason: &str,
        actor: i64,
    ) -> AppResult<EscalationRecord> {
        if level == EscalationLevel::None {
            return Err(AppError::with_message(
                ErrorCode::EscalationRejected,
                "Manual escalation cannot target level none, use resolve",
            ));
        }
        validate_required_text(reason, "reason", MAX_REASON_LEN)?;

        let t = ticket::find_by_id(&self.pool, ticket_id)
            .await?
            .ok_or_else(|| AppError::not_found("ticket"))?;

        let now = self.clock.now_millis();
        let record = self
            .apply_transition(
                ticket_id,
                t.escalation_level,
                level,
                reason,
                Some(actor),
                now,
            )
            .await?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::Conflict,
                    "Ticket escalation changed concurrently",
                )
            })?;

        tracing::info!(
            ticket_id,
            actor,
            level = %level,
            "Ticket escalated manually"
        );

        self.dispatch_notifications(&t, &record).await;
        Ok(record)
    }

    /// 解除升级：当前审计记录标记 resolved，工单回到 none
    pub async fn resolve(&self, ticket_id: i64, actor: Option<i64>) -> AppResult<()> {
        let t = ticket::find_by_id(&self.pool, ticket_id)
            .await?
            .ok_or_else(|| AppError::not_found("ticket"))?;

        if t.escalation_level == EscalationLevel::None {
            return Err(AppError::new(ErrorCode::NoActiveEscalation));
        }

        let now = self.clock.now_millis();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        ticket::reset_escalation(&mut *tx, ticket_id).await?;
        escalation_record::resolve_open(&mut *tx, ticket_id, actor, now).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit resolution: {e}")))?;

        tracing::info!(ticket_id, "Ticket escalation resolved");
        Ok(())
    }
}

/// 扫描调度器 - 固定间隔触发扫描，CancellationToken 干净停机
pub struct SweepScheduler {
    sweeper: Arc<EscalationSweeper>,
    interval: Duration,
    cancel: CancellationToken,
}

impl SweepScheduler {
    pub fn new(sweeper: Arc<EscalationSweeper>, interval: Duration) -> Self {
        Self {
            sweeper,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// 取消令牌（外层持有用于停机）
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 运行调度循环（直到取消）
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Sweep scheduler started");

        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Sweep scheduler stopping");
                    break;
                }
                _ = tick.tick() => {
                    let report = self.sweeper.run_once().await;
                    if report.failed > 0 || report.deadline_hit {
                        tracing::warn!(?report, "Sweep completed with issues");
                    }
                }
            }
        }
    }
}
