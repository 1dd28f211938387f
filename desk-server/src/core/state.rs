//! 引擎状态 - 组装数据库、时钟、网关与两条流水线

use std::sync::Arc;
use std::time::Duration;

use crate::capture::CapturePipeline;
use crate::clock::{Clock, SystemClock};
use crate::core::{Config, EngineError};
use crate::db::DbService;
use crate::escalation::{EscalationSweeper, ThresholdTable};
use crate::notify::{NotificationGateway, TracingGateway};

/// Engine state — everything the binary and background tasks share
pub struct EngineState {
    pub db: DbService,
    pub clock: Arc<dyn Clock>,
    pub gateway: Arc<dyn NotificationGateway>,
    pub sweeper: Arc<EscalationSweeper>,
    pub pipeline: Arc<CapturePipeline>,
}

impl EngineState {
    /// 初始化引擎状态
    ///
    /// 1. 创建工作目录
    /// 2. 打开数据库（自动跑迁移）
    /// 3. 校验阈值表并装配扫描器与捕获管线
    pub async fn initialize(config: &Config) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&config.work_dir)?;

        let db = DbService::new(&config.db_path)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let gateway: Arc<dyn NotificationGateway> = Arc::new(TracingGateway);

        let thresholds = ThresholdTable::from_ratios(config.escalation_ratios)
            .map_err(|e| EngineError::Config(e.to_string()))?;

        let sweeper = Arc::new(EscalationSweeper::new(
            db.pool.clone(),
            gateway.clone(),
            clock.clone(),
            thresholds,
            Duration::from_secs(config.sweep_deadline_secs),
        ));

        let pipeline = Arc::new(CapturePipeline::new(
            db.pool.clone(),
            clock.clone(),
            config.system_actor_id,
        ));

        tracing::info!("Engine state initialized");

        Ok(Self {
            db,
            clock,
            gateway,
            sweeper,
            pipeline,
        })
    }
}
