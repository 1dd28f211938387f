//! 升级时钟（纯函数，无副作用）
//!
//! 输入 (创建时间, 完结标记, SLA 策略, 当前时间)，输出升级等级。
//! 档位切分是可配置的比例表，不是写死的算式：等级由
//! `elapsed / 最近被突破的预算` 查表得出。

use shared::models::{EscalationLevel, SlaPolicy};
use shared::util::MILLIS_PER_HOUR;

use crate::core::config::EscalationRatios;
use crate::utils::AppError;

/// 一个档位：比例下界（含）→ 等级
#[derive(Debug, Clone, Copy)]
struct ThresholdStep {
    min_ratio: f64,
    level: EscalationLevel,
}

/// 可配置的升级档位表
///
/// 比例相对"最近被突破的预算"：1.0 = 刚好用完预算。
/// 表必须严格递增且全部为正。
#[derive(Debug, Clone)]
pub struct ThresholdTable {
    steps: Vec<ThresholdStep>,
}

impl ThresholdTable {
    /// 从四个档位比例构造，校验严格递增
    pub fn from_ratios(ratios: EscalationRatios) -> Result<Self, AppError> {
        let steps = vec![
            ThresholdStep {
                min_ratio: ratios.warning,
                level: EscalationLevel::Warning,
            },
            ThresholdStep {
                min_ratio: ratios.escalated,
                level: EscalationLevel::Escalated,
            },
            ThresholdStep {
                min_ratio: ratios.critical,
                level: EscalationLevel::Critical,
            },
            ThresholdStep {
                min_ratio: ratios.urgent,
                level: EscalationLevel::Urgent,
            },
        ];

        for pair in steps.windows(2) {
            if pair[0].min_ratio >= pair[1].min_ratio {
                return Err(AppError::validation(
                    "Escalation ratios must be strictly ascending",
                ));
            }
        }
        if steps[0].min_ratio <= 0.0 {
            return Err(AppError::validation("Escalation ratios must be positive"));
        }

        Ok(Self { steps })
    }

    /// 比例落在哪个档位（低于最低档 → None 等级）
    pub fn level_for_ratio(&self, ratio: f64) -> EscalationLevel {
        let mut level = EscalationLevel::None;
        for step in &self.steps {
            if ratio > step.min_ratio {
                level = step.level;
            }
        }
        level
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::from_ratios(EscalationRatios::default())
            .expect("default ratios are ascending")
    }
}

/// 工单此刻应处的升级等级
///
/// - 策略缺失或 inactive → `None`（不是错误，是"该工单没有升级语义"）
/// - 预算适用性：响应预算始终适用；解决预算只在未完结时适用
/// - 突破多个预算时，以最近被突破的（数值最大的）预算计算比例
pub fn level_for(
    policy: Option<&SlaPolicy>,
    created_at: i64,
    completed: bool,
    now: i64,
    table: &ThresholdTable,
) -> EscalationLevel {
    let Some(policy) = policy.filter(|p| p.active) else {
        return EscalationLevel::None;
    };

    let elapsed_hours = elapsed_hours(created_at, now);
    let breached: Vec<f64> = applicable_budgets(policy, completed)
        .into_iter()
        .filter(|budget| elapsed_hours > *budget)
        .collect();

    let Some(nearest) = breached.into_iter().reduce(f64::max) else {
        return EscalationLevel::None;
    };

    table.level_for_ratio(elapsed_hours / nearest)
}

/// 距最近一个未用完预算归零的带符号小时数
///
/// 正数 = 还有富余（"at risk" 面板用），负数 = 已超出最近被突破的
/// 预算。没有适用预算时返回 None。
pub fn remaining_hours(
    policy: Option<&SlaPolicy>,
    created_at: i64,
    completed: bool,
    now: i64,
) -> Option<f64> {
    let policy = policy.filter(|p| p.active)?;
    let elapsed = elapsed_hours(created_at, now);
    let remainings: Vec<f64> = applicable_budgets(policy, completed)
        .into_iter()
        .map(|budget| budget - elapsed)
        .collect();
    if remainings.is_empty() {
        return None;
    }

    let unconsumed: Vec<f64> = remainings.iter().copied().filter(|r| *r >= 0.0).collect();
    if unconsumed.is_empty() {
        // 全部突破：报最接近零的（最近被突破的预算的超额）
        remainings.into_iter().reduce(f64::max)
    } else {
        // 尚有未突破预算：报最先归零的
        unconsumed.into_iter().reduce(f64::min)
    }
}

/// 预算突破的人读描述（审计记录的 reason）
pub fn breach_summary(remaining: Option<f64>) -> String {
    match remaining {
        Some(r) if r < 0.0 => format!("SLA exceeded by {} hours", r.abs().round() as i64),
        Some(r) => format!("{} hours remaining", r.round() as i64),
        None => "No applicable SLA budget".to_string(),
    }
}

fn elapsed_hours(created_at: i64, now: i64) -> f64 {
    // 时钟回拨按 0 处理，绝不产生负 elapsed
    (now - created_at).max(0) as f64 / MILLIS_PER_HOUR as f64
}

fn applicable_budgets(policy: &SlaPolicy, completed: bool) -> Vec<f64> {
    let mut budgets = Vec::with_capacity(2);
    if let Some(response) = policy.response_time_hours {
        budgets.push(response as f64);
    }
    if !completed && let Some(resolution) = policy.resolution_time_hours {
        budgets.push(resolution as f64);
    }
    budgets
}
