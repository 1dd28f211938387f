//! Desk Server - 工单后台的自动化事件生命周期引擎
//!
//! # 架构概述
//!
//! 本模块是引擎的主入口，提供两条独立的事件流水线：
//!
//! - **升级扫描** (`escalation`): 周期性评估未完结工单的 SLA 预算，
//!   推进升级状态机并触发通知
//! - **错误捕获** (`capture`): 接收原始应用错误，在滑动窗口内去重，
//!   按策略一次性物化为工单
//!
//! # 模块结构
//!
//! ```text
//! desk-server/src/
//! ├── core/          # 配置、状态、错误
//! ├── clock.rs       # 可注入时钟
//! ├── db/            # SQLite 数据库层 (sqlx, WAL)
//! ├── escalation/    # 升级时钟 + 扫描器
//! ├── capture/       # 错误身份、去重、捕获管线
//! ├── notify/        # 通知网关边界
//! └── utils/         # 日志、校验工具
//! ```

pub mod capture;
pub mod clock;
pub mod core;
pub mod db;
pub mod escalation;
pub mod notify;
pub mod utils;

// Re-export 公共类型
pub use capture::CapturePipeline;
pub use clock::{Clock, ManualClock, SystemClock};
pub use crate::core::{Config, EngineError, EngineState};
pub use db::DbService;
pub use escalation::{EscalationSweeper, SweepReport, SweepScheduler, ThresholdTable};
pub use notify::{NotificationGateway, NotifyError, TracingGateway};

// Re-export unified error types from shared
pub use utils::{AppError, AppResult, ErrorCode};

/// 设置运行环境：dotenv + 日志
pub fn setup_environment() {
    dotenv::dotenv().ok();
    utils::logger::init_logger();
}

pub fn print_banner() {
    println!(
        r#"
    ____            __
   / __ \___  _____/ /__
  / / / / _ \/ ___/ //_/
 / /_/ /  __(__  ) ,<
/_____/\___/____/_/|_|
    "#
    );
}
