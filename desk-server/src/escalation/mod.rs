//! 升级子系统
//!
//! - [`clock`] - 纯升级时钟：SLA 预算 → 升级等级，无副作用
//! - [`sweeper`] - 周期扫描器：等级迁移落库 + 审计 + 通知

pub mod clock;
pub mod sweeper;

pub use clock::ThresholdTable;
pub use sweeper::{EscalationSweeper, SweepReport, SweepScheduler};
