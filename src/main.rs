// ==========================================
// 价格目录去重系统 - 命令行入口
// ==========================================
// 退出: 启动期致命错误输出诊断并以非零状态退出；
//       耗时汇总无论跳过多少文件都会输出
// ==========================================

use anyhow::Context;
use clap::Parser;
use price_dedup::{logging, MergeStrategy, Pipeline, RunConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "price-dedup", version, about = "价目表归一化、去重与 SQL 导出")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "./config.json")]
    config: PathBuf,

    /// 价目表目录（覆盖配置）
    #[arg(long)]
    prices_dir: Option<PathBuf>,

    /// SQLite 数据库路径（覆盖配置）
    #[arg(long)]
    db: Option<String>,

    /// 导出 SQL 文件路径（覆盖配置）
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 使用两步写入 + 分片锁（默认单语句 upsert）
    #[arg(long)]
    locked: bool,

    /// 运行前不清空 products 表
    #[arg(long)]
    keep_existing: bool,

    /// JSON 格式日志
    #[arg(long)]
    log_json: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<RunConfig> {
    let mut config = RunConfig::load(&cli.config)
        .with_context(|| format!("无法加载配置文件 {}", cli.config.display()))?;

    if let Some(dir) = &cli.prices_dir {
        config.prices_dir = dir.clone();
    }
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    if let Some(output) = &cli.output {
        config.output_path = output.clone();
    }
    if cli.locked {
        config.merge_strategy = MergeStrategy::Locked;
    }
    if cli.keep_existing {
        config.reset_before_run = false;
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let pipeline = Pipeline::open(config).context("无法连接数据库")?;
    let summary = pipeline.run().await?;

    let ingest = &summary.ingest;
    tracing::info!(
        files = ingest.files.len(),
        files_failed = ingest.files_failed(),
        inserted = ingest.total_inserted(),
        updated = ingest.total_updated(),
        soft_conflicts = ingest.soft_conflicts().count(),
        exported = summary.exported,
        "运行完成"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    tracing::info!("{} v{}", price_dedup::APP_NAME, price_dedup::VERSION);

    let start = Instant::now();
    let result = run(cli).await;
    let elapsed = start.elapsed();

    println!("执行时间: {:.2} 秒", elapsed.as_secs_f64());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("致命错误: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
