//! # xtask - 行推进器工作区门禁
//!
//! 本地提交前跑一遍即可，CI 使用同一套命令。
//!
//! ## 命令
//!
//! - `check-all`: 格式、lint、全部测试，最后校验示例配置
//! - `cov-runtime`: 只统计 advance-runtime（协议核心）的覆盖率
//! - `cov-workspace`: 统计 runtime + cli 的覆盖率
//! - `config-check`: 校验 `*.advancer.json` 推进器配置

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use advance_runtime::{AdvancerConfig, DiagnosticLevel, DiagnosticResult, InputEnvironment};
use walkdir::WalkDir;

/// 配置文件后缀
const CONFIG_SUFFIX: &str = ".advancer.json";

/// 默认配置目录（CLI 回放用的示例配置）
const DEFAULT_CONFIG_DIR: &str = "advance-cli/traces";

fn cargo(args: &[&str]) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(args);
    cmd
}

fn run(step: &str, cmd: &mut Command) -> anyhow::Result<()> {
    eprintln!("\n==> {step}");
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("{step} failed with {status}");
    }
    Ok(())
}

fn ensure_cargo_llvm_cov_available() -> anyhow::Result<()> {
    match cargo(&["llvm-cov", "--version"]).status() {
        Ok(s) if s.success() => Ok(()),
        _ => anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        ),
    }
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => {
            run("格式", &mut cargo(&["fmt", "--all", "--", "--check"]))?;
            run(
                "lint（警告即失败）",
                &mut cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"]),
            )?;
            run("测试", &mut cargo(&["test", "--workspace"]))?;
            eprintln!("\n==> 示例配置");
            config_check(None)?;
        }
        "cov-runtime" => {
            ensure_cargo_llvm_cov_available()?;
            run(
                "advance-runtime 覆盖率",
                &mut cargo(&["llvm-cov", "-p", "advance-runtime", "--html"]),
            )?;
            eprintln!("\n报告: target/llvm-cov/html/index.html");
        }
        "cov-workspace" => {
            ensure_cargo_llvm_cov_available()?;
            // xtask 自身不计入
            run(
                "workspace 覆盖率",
                &mut cargo(&["llvm-cov", "--workspace", "--exclude", "xtask", "--html"]),
            )?;
            eprintln!("\n报告: target/llvm-cov/html/index.html");
        }
        "config-check" => {
            let path = args.next();
            config_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 行推进器工作区门禁

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       fmt --check、clippy -D warnings、test，然后 config-check
  cov-runtime     advance-runtime 覆盖率（HTML）
  cov-workspace   advance-runtime + advance-cli 覆盖率（HTML）
  config-check    校验推进器配置 [path]，默认 {DEFAULT_CONFIG_DIR}

config-check 会严格加载每个 *.advancer.json（advance_threshold 为 0、
未知输入模式都算失败），再按“所有输入后端可用”的宿主环境校验，
只打印 WARN 及以上的诊断。

cargo 别名见 .cargo/config.toml（check-all / cov-runtime / cov-workspace / config-check）。
"#
    );
}

//=============================================================================
// config-check 命令实现
//=============================================================================

/// 配置检查结果
struct ConfigCheckResult {
    /// 检查的配置数量
    configs_checked: usize,
    /// 加载失败数量
    load_errors: usize,
    /// 诊断结果（带文件名）
    diagnostics: Vec<(String, DiagnosticResult)>,
}

/// 执行配置检查
fn config_check(path: Option<&str>) -> anyhow::Result<()> {
    let root = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_DIR));
    if !root.exists() {
        anyhow::bail!(
            "路径不存在: {}\n请在 workspace 根目录运行，或指定配置路径",
            root.display()
        );
    }

    let files = collect_config_files(&root)?;
    if files.is_empty() {
        eprintln!("未找到配置文件（*{CONFIG_SUFFIX}）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个配置文件...\n", files.len());

    let env = InputEnvironment::default();
    let mut result = ConfigCheckResult {
        configs_checked: 0,
        load_errors: 0,
        diagnostics: Vec::new(),
    };

    for file in &files {
        result.configs_checked += 1;
        match AdvancerConfig::load_strict(file) {
            Ok(config) => {
                let diag = config.validate(&env);
                if !diag.is_empty() {
                    result.diagnostics.push((file.display().to_string(), diag));
                }
            }
            Err(e) => {
                eprintln!("[ERROR] {}: {}", file.display(), e);
                result.load_errors += 1;
            }
        }
    }

    print_check_result(&result);

    if result.load_errors > 0 || result.diagnostics.iter().any(|(_, d)| d.has_errors()) {
        anyhow::bail!("配置检查发现错误");
    }

    Ok(())
}

/// 收集配置文件
fn collect_config_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        let is_config = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(CONFIG_SUFFIX));
        if entry.file_type().is_file() && is_config {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// 输出检查结果
fn print_check_result(result: &ConfigCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个配置", result.configs_checked);
    eprintln!();

    let mut error_count = result.load_errors;
    let mut warn_count = 0;
    for (file, diag) in &result.diagnostics {
        for d in diag.filter_by_level(DiagnosticLevel::Warn) {
            eprintln!("{}: {}", file, d);
        }
        error_count += diag.error_count();
        warn_count += diag.warn_count();
    }

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
