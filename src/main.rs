use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pake_configure::{resolve_platform, BuildContext, HttpFetcher, Pipeline};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tauri 工程目录，配置与图标都相对该目录
    #[arg(long, default_value = "src-tauri")]
    tauri_dir: PathBuf,

    /// 目标平台（linux / macos / windows），默认取宿主系统
    #[arg(short, long)]
    platform: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging();

    // 参数与平台在任何文件读写之前校验
    let ctx = BuildContext::from_env()?;
    let platform = resolve_platform(args.platform.as_deref())?;

    let rt = tokio::runtime::Runtime::new()?;
    let pipeline = Pipeline::new(args.tauri_dir, platform, HttpFetcher::new()?);
    let report = rt.block_on(pipeline.run(&ctx))?;

    let missing = report.missing();
    if !missing.is_empty() {
        tracing::warn!("finished with missing icons: {}", missing.join(", "));
    }
    tracing::info!("{} configuration finished", report.platform);
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
