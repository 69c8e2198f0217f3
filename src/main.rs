use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use app_lib::commands::{fibonacci_cmd, signal_cmd, theme_cmd};
use app_lib::models::theme::AnalyzeRequest;
use app_lib::services::providers::{PastedTurnover, PastedWatchList};
use app_lib::AppState;

#[derive(Parser)]
#[command(name = "tw-radar")]
#[command(about = "台股技术讯号与族群热度分析", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 个股日/周 KD、MA20 讯号与分形支撑压力
    Signals {
        code: String,
    },
    /// 斐波那契回撤与扩展价位
    Fib {
        high: f64,
        low: f64,
    },
    /// 列出族群表
    Themes,
    /// 族群热度分析：周转率排行与注意股公告两个批次
    Analyze {
        /// 周转率排行表格（文字档）。省略时抓证交所、柜买中心全市场资料
        #[arg(long)]
        turnover: Option<PathBuf>,
        /// 注意股公告（文字档）
        #[arg(long)]
        watch_list: Option<PathBuf>,
        /// 只取周转率前 N 名
        #[arg(long)]
        top: Option<usize>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

fn read_text(path: &PathBuf) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("读取 {} 失败: {}", path.display(), e))
}

async fn run(cli: Cli) -> Result<(), String> {
    let state = AppState::load();

    match cli.command {
        Commands::Signals { code } => {
            let report = signal_cmd::get_stock_signals(&state, signal_cmd::SignalRequest { code }).await?;
            print_json(&report)
        }
        Commands::Fib { high, low } => {
            let report = fibonacci_cmd::calculate_fibonacci(fibonacci_cmd::FibonacciRequest { high, low })?;
            print_json(&report)
        }
        Commands::Themes => print_json(&theme_cmd::list_themes(&state)?),
        Commands::Analyze { turnover, watch_list, top } => {
            let watch_list = PastedWatchList {
                text: watch_list.as_ref().map(read_text).transpose()?.unwrap_or_default(),
            };
            let request = AnalyzeRequest { top_n: top };
            let response = match turnover {
                Some(path) => {
                    let turnover = PastedTurnover { text: read_text(&path)? };
                    theme_cmd::analyze_themes(&state, &turnover, &watch_list, request).await?
                }
                None => theme_cmd::analyze_market_themes(&state, &watch_list, request).await?,
            };
            print_json(&response)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
