use std::sync::Arc;
use std::time::Duration;

use desk_server::{print_banner, setup_environment, Config, EngineState, SweepScheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志)
    setup_environment();

    // 打印横幅
    print_banner();

    tracing::info!("🛎️ Desk incident engine starting...");

    // 2. 加载配置
    let config = Config::from_env();

    // 3. 初始化引擎状态 (数据库、网关、扫描器、捕获管线)
    let state = Arc::new(EngineState::initialize(&config).await?);

    // 4. 启动升级扫描调度器
    let scheduler = SweepScheduler::new(
        state.sweeper.clone(),
        Duration::from_secs(config.sweep_interval_secs),
    );
    let cancel = scheduler.cancel_token();
    let scheduler_handle = tokio::spawn(scheduler.run());

    // 5. 等待关闭信号
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping scheduler");
    cancel.cancel();
    let _ = scheduler_handle.await;

    tracing::info!("Desk incident engine stopped");
    Ok(())
}
