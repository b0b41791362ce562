//! # 诊断模块
//!
//! 提供可供宿主检查的诊断通道，不依赖 IO 或引擎。
//!
//! ## 设计原则
//!
//! - 所有失败都是本地的、不抛出的：只记录诊断，不向宿主传播 panic
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 每条诊断带有稳定的 [`DiagnosticCode`]，便于测试和工具按类别过滤

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// 未绑定 DialogueRunner（或已被释放）
    MissingRunner,
    /// DialogueRunner 正在被借用（重入调用）
    RunnerBusy,
    /// 没有活动行时收到的请求
    StaleRequest,
    /// 会话已取消后收到的请求
    PostSession,
    /// 所选输入后端在当前环境不可用
    BackendUnavailable,
    /// 动作模式下没有挂接动作系统
    NoActionSystem,
    /// None 模式：需要宿主手动调用请求方法
    ManualInput,
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MissingRunner => "missing_runner",
            Self::RunnerBusy => "runner_busy",
            Self::StaleRequest => "stale_request",
            Self::PostSession => "post_session",
            Self::BackendUnavailable => "backend_unavailable",
            Self::NoActionSystem => "no_action_system",
            Self::ManualInput => "manual_input",
        };
        f.write_str(name)
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 诊断类别
    pub code: DiagnosticCode,
    /// 诊断消息
    pub message: String,
    /// 诊断详情（可选，如修复建议）
    pub detail: Option<String>,
}

impl Diagnostic {
    /// 创建错误诊断
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, code, message)
    }

    /// 创建警告诊断
    pub fn warn(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, code, message)
    }

    /// 创建信息诊断
    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, code, message)
    }

    fn new(level: DiagnosticLevel, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            message: message.into(),
            detail: None,
        }
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.code, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticResult {
    /// 诊断条目列表
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    /// 创建空结果
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加诊断
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// 获取错误数量
    pub fn error_count(&self) -> usize {
        self.count_level(DiagnosticLevel::Error)
    }

    /// 获取警告数量
    pub fn warn_count(&self) -> usize {
        self.count_level(DiagnosticLevel::Warn)
    }

    fn count_level(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    /// 指定类别的诊断数量
    pub fn count_code(&self, code: DiagnosticCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 诊断条目数量
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// 按级别过滤
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }

    /// 取出全部诊断，留下空结果
    pub fn take(&mut self) -> DiagnosticResult {
        std::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::warn(DiagnosticCode::MissingRunner, "runner 未绑定")
            .with_detail("请先调用 bind_runner");
        assert_eq!(
            diag.to_string(),
            "[WARN] missing_runner: runner 未绑定\n  | 请先调用 bind_runner"
        );
    }

    #[test]
    fn test_result_counts() {
        let mut result = DiagnosticResult::new();
        result.push(Diagnostic::info(DiagnosticCode::StaleRequest, "a"));
        result.push(Diagnostic::warn(DiagnosticCode::MissingRunner, "b"));
        result.push(Diagnostic::warn(DiagnosticCode::MissingRunner, "c"));
        result.push(Diagnostic::error(DiagnosticCode::RunnerBusy, "d"));

        assert_eq!(result.len(), 4);
        assert_eq!(result.warn_count(), 2);
        assert_eq!(result.error_count(), 1);
        assert!(result.has_errors());
        assert_eq!(result.count_code(DiagnosticCode::MissingRunner), 2);
        assert_eq!(result.filter_by_level(DiagnosticLevel::Warn).len(), 3);
    }

    #[test]
    fn test_take_leaves_empty_result() {
        let mut result = DiagnosticResult::new();
        result.push(Diagnostic::info(DiagnosticCode::ManualInput, "x"));

        let taken = result.take();
        assert_eq!(taken.len(), 1);
        assert!(result.is_empty());
    }

    #[test]
    fn test_merge() {
        let mut a = DiagnosticResult::new();
        a.push(Diagnostic::info(DiagnosticCode::ManualInput, "x"));
        let mut b = DiagnosticResult::new();
        b.push(Diagnostic::warn(DiagnosticCode::BackendUnavailable, "y"));
        a.merge(b);
        assert_eq!(a.len(), 2);
    }
}
