//! Exception Notifier CLI
//!
//! 检查服务配置并发送测试通知

use anyhow::Result;
use clap::{Parser, Subcommand};
use exception_notifier::cli::{handle_config, handle_test, ConfigArgs, TestArgs};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "notice")]
#[command(about = "Exception Notifier - 发送异常通知到错误追踪服务")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 发送一条测试通知
    Test(TestArgs),
    /// 查看服务配置
    Config(ConfigArgs),
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("exception_notifier=info,notice=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Test(args) => handle_test(args)?,
        Commands::Config(args) => handle_config(args)?,
    }

    Ok(())
}
