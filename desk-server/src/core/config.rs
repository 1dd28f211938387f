/// 引擎配置 - 事件生命周期引擎的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/desk | 工作目录 |
/// | DB_PATH | {WORK_DIR}/desk.db | SQLite 数据库文件 |
/// | SWEEP_INTERVAL_SECS | 300 | 升级扫描周期(秒) |
/// | SWEEP_DEADLINE_SECS | 240 | 单次扫描的最长运行时间(秒) |
/// | SYSTEM_ACTOR_ID | 0 | 无认证上下文时记录的系统操作者 |
/// | ESCALATION_WARNING_RATIO | 1.0 | warning 档位的预算比例 |
/// | ESCALATION_ESCALATED_RATIO | 1.25 | escalated 档位的预算比例 |
/// | ESCALATION_CRITICAL_RATIO | 2.0 | critical 档位的预算比例 |
/// | ESCALATION_URGENT_RATIO | 4.0 | urgent 档位的预算比例 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/desk SWEEP_INTERVAL_SECS=60 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// SQLite 数据库文件路径
    pub db_path: String,
    /// 升级扫描周期（秒）
    pub sweep_interval_secs: u64,
    /// 单次扫描超过此时长后，处理完当前工单即干净退出
    pub sweep_deadline_secs: u64,
    /// 系统操作者 ID（控制台/调度任务错误没有登录操作者时使用）
    pub system_actor_id: i64,
    /// 升级档位比例表（相对最近被突破的预算，严格递增）
    pub escalation_ratios: EscalationRatios,
}

/// 升级档位的预算比例（§升级时钟的可配置阈值表）
#[derive(Debug, Clone, Copy)]
pub struct EscalationRatios {
    pub warning: f64,
    pub escalated: f64,
    pub critical: f64,
    pub urgent: f64,
}

impl Default for EscalationRatios {
    fn default() -> Self {
        Self {
            warning: 1.0,
            escalated: 1.25,
            critical: 2.0,
            urgent: 4.0,
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/desk".into());
        let db_path =
            std::env::var("DB_PATH").unwrap_or_else(|_| format!("{}/desk.db", work_dir));
        let defaults = EscalationRatios::default();

        Self {
            work_dir,
            db_path,
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", 300),
            sweep_deadline_secs: env_parse("SWEEP_DEADLINE_SECS", 240),
            system_actor_id: env_parse("SYSTEM_ACTOR_ID", 0),
            escalation_ratios: EscalationRatios {
                warning: env_parse("ESCALATION_WARNING_RATIO", defaults.warning),
                escalated: env_parse("ESCALATION_ESCALATED_RATIO", defaults.escalated),
                critical: env_parse("ESCALATION_CRITICAL_RATIO", defaults.critical),
                urgent: env_parse("ESCALATION_URGENT_RATIO", defaults.urgent),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
