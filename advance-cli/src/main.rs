//! # Advance CLI
//!
//! 行推进器的无头宿主：检查配置、回放输入轨迹。
//!
//! ## 用法
//!
//! ```bash
//! # 检查配置（默认宿主环境：所有输入后端可用）
//! cargo run -p advance-cli -- check advancer.json
//! cargo run -p advance-cli -- check advancer.json --legacy-disabled --deny-warnings
//!
//! # 回放输入轨迹，打印 runner 收到的调用
//! cargo run -p advance-cli -- replay advancer.json advance-cli/traces/escalation.json
//! cargo run -p advance-cli -- replay advancer.json trace.json --json
//! ```

mod trace;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use advance_runtime::{AdvancerConfig, InputEnvironment};
use clap::{Parser, Subcommand};
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "advance")]
#[command(about = "行推进器无头宿主 - 配置检查与输入轨迹回放")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 针对宿主环境检查配置
    Check {
        /// 配置文件路径
        config: PathBuf,

        /// 宿主未安装动作系统
        #[arg(long)]
        no_action_system: bool,

        /// 宿主动作系统未启用
        #[arg(long)]
        action_system_disabled: bool,

        /// 宿主旧式输入管理器未启用
        #[arg(long)]
        legacy_disabled: bool,

        /// 有警告时也返回失败
        #[arg(long)]
        deny_warnings: bool,
    },

    /// 回放输入轨迹
    Replay {
        /// 配置文件路径
        config: PathBuf,

        /// 轨迹文件路径（JSON 事件数组）
        trace: PathBuf,

        /// 以 JSON 输出回放结果
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("❌ {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Check {
            config,
            no_action_system,
            action_system_disabled,
            legacy_disabled,
            deny_warnings,
        } => {
            let env = InputEnvironment {
                action_system_installed: !no_action_system,
                action_system_enabled: !action_system_disabled,
                legacy_input_enabled: !legacy_disabled,
            };
            check(&config, &env, deny_warnings)
        }
        Commands::Replay {
            config,
            trace,
            json,
        } => replay(&config, &trace, json),
    }
}

fn check(path: &Path, env: &InputEnvironment, deny_warnings: bool) -> anyhow::Result<()> {
    let config = AdvancerConfig::load_strict(path)?;
    info!(path = %path.display(), mode = %config.input.mode(), "检查配置");

    let result = config.validate(env);
    for diag in &result.diagnostics {
        eprintln!("{}", diag);
    }

    if result.has_errors() || (deny_warnings && result.warn_count() > 0) {
        anyhow::bail!(
            "配置检查未通过：{} 个错误, {} 个警告",
            result.error_count(),
            result.warn_count()
        );
    }

    eprintln!("✅ 配置检查通过（{} 个警告）", result.warn_count());
    Ok(())
}

fn replay(config_path: &Path, trace_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = AdvancerConfig::load_strict(config_path)?;
    let events = trace::load_trace(trace_path)?;
    info!(events = events.len(), mode = %config.input.mode(), "开始回放");

    let report = trace::replay(config, &events);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for call in &report.calls {
        println!("{}", call);
    }
    for diag in &report.diagnostics {
        eprintln!("{}", diag);
    }
    eprintln!(
        "回放完成: {} 个事件, {} 次 runner 调用, {} 条诊断{}",
        report.events,
        report.calls.len(),
        report.diagnostics.len(),
        if report.stopped { "（对话已取消）" } else { "" }
    );
    Ok(())
}
