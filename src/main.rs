// ==========================================
// 仓单库存同步系统 - 批处理入口
// ==========================================
// 用法:
//   warehouse-stocks [config.json]
// 退出码: 0 = 完成（允许部分品种失败）; 非 0 = 配置/数据库错误或全部源文件不可读
// ==========================================

use anyhow::Context;
use warehouse_stocks::engine::{IngestOrchestrator, PipelineError};
use warehouse_stocks::{logging, IngestConfig, SnapshotRepository};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", warehouse_stocks::APP_NAME, warehouse_stocks::VERSION);
    tracing::info!("==================================================");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = IngestConfig::load(config_path.as_deref()).context("加载配置失败")?;

    tracing::info!(
        data_dir = %config.data_dir.display(),
        document = %config.document_path.display(),
        db = %config.db_path,
        "配置加载完成"
    );

    let store = SnapshotRepository::new(&config.db_path)
        .with_context(|| format!("无法打开数据库: {}", config.db_path))?;

    let orchestrator = IngestOrchestrator::new(config, store);
    match orchestrator.run().await {
        Ok(report) => {
            let tally = report.tally();
            println!("run_id={}", report.run_id);
            for (commodity, outcome) in &report.outcomes {
                println!("  {:<20} {}", commodity, outcome);
            }
            println!(
                "succeeded={} carried_forward={} failed={}",
                tally.succeeded, tally.carried_forward, tally.failed
            );
            Ok(())
        }
        Err(e @ PipelineError::NoInputReadable { .. }) => {
            tracing::error!(error = %e, "同步中止");
            Err(e.into())
        }
        Err(e) => Err(anyhow::Error::new(e).context("同步失败")),
    }
}
