//! # Controller 模块
//!
//! 行推进控制器：把重复的 hurry up 信号按策略转换为
//! 多次加速请求或一次升级后的 next line 请求，并原样转发
//! next line 与取消对话请求。
//!
//! ## 状态
//!
//! ```text
//! Idle ──on_line_started──► Running ──request_dialogue_cancellation──► Stopped
//!  ▲                           │                                          │
//!  └────────end_session────────┴───────────────begin_session──────────────┘
//! ```
//!
//! - `advance_count` 只在 `on_line_started` 时归零
//! - runner 缺失时每个请求恰好记录一条 Warn，先于其他检查
//! - 没有活动行时收到的 hurry up / next line 视为属于上一行，忽略并记录 Info
//! - 所有请求都不会 panic，也不会向宿主返回错误

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, error, warn};

use crate::config::AdvancePolicy;
use crate::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticLevel, DiagnosticResult};
use crate::runner::{DialogueRunner, RunnerCall};
use crate::signal::AdvanceSignal;
use crate::view::LineToken;

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// 没有对话在运行
    #[default]
    Idle,
    /// 对话运行中
    Running,
    /// 对话已被取消，直到下一次 `begin_session` 前不再开始新行
    Stopped,
}

/// 当前行的推进状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvanceState {
    line: Option<LineToken>,
    advance_count: u32,
}

impl AdvanceState {
    fn begin(&mut self, line: LineToken) {
        self.line = Some(line);
        self.advance_count = 0;
    }

    fn clear(&mut self) {
        self.line = None;
        self.advance_count = 0;
    }

    /// 当前活动行
    pub fn line(&self) -> Option<&LineToken> {
        self.line.as_ref()
    }

    /// 本行收到的 hurry up 次数
    pub fn advance_count(&self) -> u32 {
        self.advance_count
    }

    /// 是否有活动行
    pub fn is_active(&self) -> bool {
        self.line.is_some()
    }
}

/// 行推进控制器
#[derive(Debug)]
pub struct LineAdvanceController {
    policy: AdvancePolicy,
    runner: Option<Weak<RefCell<dyn DialogueRunner>>>,
    state: AdvanceState,
    phase: SessionPhase,
    diagnostics: DiagnosticResult,
    forwarded: u64,
}

impl LineAdvanceController {
    /// 创建控制器（未绑定 runner）
    pub fn new(policy: AdvancePolicy) -> Self {
        Self {
            policy,
            runner: None,
            state: AdvanceState::default(),
            phase: SessionPhase::Idle,
            diagnostics: DiagnosticResult::new(),
            forwarded: 0,
        }
    }

    /// 绑定 runner
    ///
    /// 只保存弱引用，runner 的生命周期由宿主管理。
    pub fn bind_runner<R: DialogueRunner + 'static>(&mut self, runner: &Rc<RefCell<R>>) {
        let runner: Rc<RefCell<dyn DialogueRunner>> = runner.clone();
        self.runner = Some(Rc::downgrade(&runner));
    }

    /// 解除 runner 绑定
    pub fn unbind_runner(&mut self) {
        self.runner = None;
    }

    /// runner 是否绑定且仍然存活
    pub fn has_runner(&self) -> bool {
        self.runner
            .as_ref()
            .is_some_and(|runner| runner.strong_count() > 0)
    }

    /// 推进策略
    pub fn policy(&self) -> &AdvancePolicy {
        &self.policy
    }

    /// 当前行状态
    pub fn state(&self) -> &AdvanceState {
        &self.state
    }

    /// 会话阶段
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// 成功转发给 runner 的调用总数
    pub fn forwarded_count(&self) -> u64 {
        self.forwarded
    }

    /// 累积的诊断
    pub fn diagnostics(&self) -> &DiagnosticResult {
        &self.diagnostics
    }

    /// 取出累积的诊断
    pub fn drain_diagnostics(&mut self) -> DiagnosticResult {
        self.diagnostics.take()
    }

    //=========================================================================
    // 生命周期
    //=========================================================================

    /// 对话会话开始
    pub fn begin_session(&mut self) {
        self.phase = SessionPhase::Running;
        self.state.clear();
    }

    /// 对话会话结束
    pub fn end_session(&mut self) {
        self.phase = SessionPhase::Idle;
        self.state.clear();
    }

    /// 新的一行开始呈现
    ///
    /// 返回该行是否被接受；会话已取消时拒绝。
    pub fn on_line_started(&mut self, line: LineToken) -> bool {
        if self.phase == SessionPhase::Stopped {
            self.report(
                Diagnostic::info(DiagnosticCode::PostSession, "对话已取消，忽略新行")
                    .with_detail(format!("line = {}", line)),
            );
            return false;
        }

        debug!(line = %line, "行开始，推进计数归零");
        self.phase = SessionPhase::Running;
        self.state.begin(line);
        true
    }

    /// 一行呈现结束
    ///
    /// 只有与当前活动行匹配的令牌才会清空状态。
    pub fn on_line_ended(&mut self, line: &LineToken) -> bool {
        if self.state.line() != Some(line) {
            debug!(line = %line, "结束的不是当前行，忽略");
            return false;
        }
        self.state.clear();
        true
    }

    //=========================================================================
    // 请求
    //=========================================================================

    /// 按信号派发到对应的请求方法
    pub fn handle_signal(&mut self, signal: AdvanceSignal) {
        match signal {
            AdvanceSignal::HurryUp => self.request_hurry_up(),
            AdvanceSignal::NextLine => self.request_next_line(),
            AdvanceSignal::CancelDialogue => self.request_dialogue_cancellation(),
        }
    }

    /// 请求加速当前行
    ///
    /// 开启 `multi_advance_is_cancel` 且计数达到阈值时，
    /// 本次请求改为 next line（不会再额外转发 hurry up）。
    pub fn request_hurry_up(&mut self) {
        if !self.ensure_runner(RunnerCall::HurryUpLine)
            || !self.accepts_line_request(AdvanceSignal::HurryUp)
        {
            return;
        }

        self.state.advance_count = self.state.advance_count.saturating_add(1);
        let count = self.state.advance_count;

        if self.policy.escalates_at(count) {
            debug!(
                count,
                threshold = self.policy.advance_threshold(),
                "hurry up 次数达到阈值，升级为 next line"
            );
            self.forward(RunnerCall::NextLine);
        } else {
            self.forward(RunnerCall::HurryUpLine);
        }
    }

    /// 请求前进到下一行（不重置计数）
    pub fn request_next_line(&mut self) {
        if !self.ensure_runner(RunnerCall::NextLine)
            || !self.accepts_line_request(AdvanceSignal::NextLine)
        {
            return;
        }
        self.forward(RunnerCall::NextLine);
    }

    /// 请求停止整个对话
    ///
    /// 任何时候都可以投递（包括行中途）。成功转发后会话进入 `Stopped`。
    pub fn request_dialogue_cancellation(&mut self) {
        if !self.ensure_runner(RunnerCall::Stop) {
            return;
        }

        if self.phase == SessionPhase::Stopped {
            self.report(Diagnostic::info(
                DiagnosticCode::PostSession,
                "对话已取消，忽略重复的取消请求",
            ));
            return;
        }

        if self.forward(RunnerCall::Stop) {
            self.phase = SessionPhase::Stopped;
            self.state.clear();
        }
    }

    /// 行级请求是否有可作用的行
    fn accepts_line_request(&mut self, signal: AdvanceSignal) -> bool {
        if self.phase == SessionPhase::Stopped {
            self.report(
                Diagnostic::info(DiagnosticCode::PostSession, "对话已取消，忽略请求")
                    .with_detail(format!("signal = {}", signal)),
            );
            return false;
        }

        if !self.state.is_active() {
            self.report(
                Diagnostic::info(DiagnosticCode::StaleRequest, "没有活动行，忽略请求")
                    .with_detail(format!("signal = {}", signal)),
            );
            return false;
        }

        true
    }

    /// runner 缺失时记录一条警告
    ///
    /// 在行状态与会话阶段检查之前执行，缺失的 runner 不会被 Info 掩盖。
    fn ensure_runner(&mut self, call: RunnerCall) -> bool {
        if self.has_runner() {
            return true;
        }
        self.report_missing_runner(call);
        false
    }

    fn report_missing_runner(&mut self, call: RunnerCall) {
        self.report(
            Diagnostic::warn(DiagnosticCode::MissingRunner, "LineAdvancer 的 dialogue runner 为空")
                .with_detail(format!("dropped = {}", call)),
        );
    }

    /// 转发调用给 runner，返回是否送达
    fn forward(&mut self, call: RunnerCall) -> bool {
        let Some(runner) = self.runner.as_ref().and_then(Weak::upgrade) else {
            self.report_missing_runner(call);
            return false;
        };

        let Ok(mut guard) = runner.try_borrow_mut() else {
            self.report(
                Diagnostic::warn(DiagnosticCode::RunnerBusy, "dialogue runner 正被占用（重入调用）")
                    .with_detail(format!("dropped = {}", call)),
            );
            return false;
        };

        call.apply(&mut *guard);
        self.forwarded += 1;
        true
    }

    /// 记录诊断并写入日志
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            DiagnosticLevel::Info => {
                debug!(code = %diagnostic.code, detail = ?diagnostic.detail, "{}", diagnostic.message)
            }
            DiagnosticLevel::Warn => {
                warn!(code = %diagnostic.code, detail = ?diagnostic.detail, "{}", diagnostic.message)
            }
            DiagnosticLevel::Error => {
                error!(code = %diagnostic.code, detail = ?diagnostic.detail, "{}", diagnostic.message)
            }
        }
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RecordingRunner;

    fn controller(multi: bool, threshold: u32) -> (LineAdvanceController, Rc<RefCell<RecordingRunner>>) {
        let runner = Rc::new(RefCell::new(RecordingRunner::new()));
        let mut controller = LineAdvanceController::new(AdvancePolicy::new(multi, threshold).unwrap());
        controller.bind_runner(&runner);
        (controller, runner)
    }

    #[test]
    fn test_hurry_up_without_escalation() {
        let (mut c, runner) = controller(false, 1);
        c.on_line_started("l1".into());

        for _ in 0..10 {
            c.request_hurry_up();
        }

        let runner = runner.borrow();
        assert_eq!(runner.count(RunnerCall::HurryUpLine), 10);
        assert_eq!(runner.count(RunnerCall::NextLine), 0);
        assert_eq!(runner.count(RunnerCall::Stop), 0);
        assert_eq!(c.state().advance_count(), 10);
    }

    #[test]
    fn test_escalates_on_nth_request() {
        for threshold in 1..=5 {
            let (mut c, runner) = controller(true, threshold);
            c.on_line_started("l1".into());

            for _ in 0..threshold {
                c.request_hurry_up();
            }

            let runner = runner.borrow();
            let mut expected = vec![RunnerCall::HurryUpLine; (threshold - 1) as usize];
            expected.push(RunnerCall::NextLine);
            assert_eq!(runner.calls(), expected.as_slice(), "threshold = {threshold}");
        }
    }

    #[test]
    fn test_threshold_one_always_escalates() {
        let (mut c, runner) = controller(true, 1);
        c.on_line_started("l1".into());
        c.request_hurry_up();
        c.request_hurry_up();
        assert_eq!(runner.borrow().calls(), &[RunnerCall::NextLine, RunnerCall::NextLine]);
    }

    #[test]
    fn test_line_start_resets_count() {
        let (mut c, runner) = controller(true, 2);
        c.on_line_started("l1".into());
        c.request_hurry_up();
        c.on_line_started("l2".into());
        assert_eq!(c.state().advance_count(), 0);
        c.request_hurry_up();

        let runner = runner.borrow();
        assert_eq!(runner.count(RunnerCall::HurryUpLine), 2);
        assert_eq!(runner.count(RunnerCall::NextLine), 0);
    }

    #[test]
    fn test_next_line_does_not_reset_count() {
        let (mut c, _runner) = controller(false, 2);
        c.on_line_started("l1".into());
        c.request_hurry_up();
        c.request_next_line();
        assert_eq!(c.state().advance_count(), 1);
    }

    #[test]
    fn test_request_before_line_is_ignored() {
        let (mut c, runner) = controller(true, 1);
        c.request_hurry_up();
        c.request_next_line();

        assert!(runner.borrow().calls().is_empty());
        assert_eq!(c.diagnostics().count_code(DiagnosticCode::StaleRequest), 2);
        assert_eq!(c.diagnostics().warn_count(), 0);
    }

    #[test]
    fn test_request_after_line_end_is_ignored() {
        let (mut c, runner) = controller(false, 2);
        c.on_line_started("l1".into());
        assert!(c.on_line_ended(&"l1".into()));
        c.request_hurry_up();
        assert!(runner.borrow().calls().is_empty());
    }

    #[test]
    fn test_mismatched_line_end_ignored() {
        let (mut c, _runner) = controller(false, 2);
        c.on_line_started("l2".into());
        assert!(!c.on_line_ended(&"l1".into()));
        assert!(c.state().is_active());
    }

    #[test]
    fn test_cancellation_is_terminal() {
        let (mut c, runner) = controller(true, 2);
        c.begin_session();
        c.on_line_started("l1".into());
        c.request_hurry_up();
        c.request_dialogue_cancellation();

        assert_eq!(c.phase(), SessionPhase::Stopped);

        c.request_hurry_up();
        c.request_next_line();
        c.request_dialogue_cancellation();
        assert!(!c.on_line_started("l2".into()));

        let runner = runner.borrow();
        assert_eq!(runner.calls(), &[RunnerCall::HurryUpLine, RunnerCall::Stop]);
        assert_eq!(c.diagnostics().count_code(DiagnosticCode::PostSession), 4);
    }

    #[test]
    fn test_cancellation_without_line() {
        let (mut c, runner) = controller(false, 2);
        c.request_dialogue_cancellation();
        assert_eq!(runner.borrow().calls(), &[RunnerCall::Stop]);
    }

    #[test]
    fn test_new_session_after_cancellation() {
        let (mut c, runner) = controller(false, 2);
        c.on_line_started("l1".into());
        c.request_dialogue_cancellation();
        c.begin_session();
        assert!(c.on_line_started("l2".into()));
        c.request_next_line();
        assert_eq!(runner.borrow().calls(), &[RunnerCall::Stop, RunnerCall::NextLine]);
    }

    #[test]
    fn test_missing_runner_warns_once_per_request() {
        let mut c = LineAdvanceController::new(AdvancePolicy::default());
        c.on_line_started("l1".into());

        c.request_hurry_up();
        c.request_next_line();
        c.request_dialogue_cancellation();

        assert_eq!(c.diagnostics().warn_count(), 3);
        assert_eq!(c.diagnostics().count_code(DiagnosticCode::MissingRunner), 3);
        assert_eq!(c.forwarded_count(), 0);
        // 没送达的取消不会结束会话
        assert_eq!(c.phase(), SessionPhase::Running);
    }

    #[test]
    fn test_missing_runner_warns_without_active_line() {
        let mut c = LineAdvanceController::new(AdvancePolicy::default());
        c.begin_session();

        c.request_hurry_up();
        c.request_next_line();
        c.request_dialogue_cancellation();

        assert_eq!(c.diagnostics().warn_count(), 3);
        assert_eq!(c.diagnostics().count_code(DiagnosticCode::MissingRunner), 3);
        assert_eq!(c.diagnostics().count_code(DiagnosticCode::StaleRequest), 0);
        assert_eq!(c.phase(), SessionPhase::Running);
    }

    #[test]
    fn test_missing_runner_warns_after_dropped_runner_post_session() {
        let (mut c, runner) = controller(false, 2);
        c.on_line_started("l1".into());
        c.request_dialogue_cancellation();
        drop(runner);

        c.request_hurry_up();
        c.request_dialogue_cancellation();

        assert_eq!(c.diagnostics().count_code(DiagnosticCode::MissingRunner), 2);
        assert_eq!(c.diagnostics().count_code(DiagnosticCode::PostSession), 0);
    }

    #[test]
    fn test_dropped_runner_is_missing() {
        let (mut c, runner) = controller(false, 2);
        assert!(c.has_runner());
        drop(runner);
        assert!(!c.has_runner());

        c.on_line_started("l1".into());
        c.request_next_line();
        assert_eq!(c.diagnostics().count_code(DiagnosticCode::MissingRunner), 1);
    }

    #[test]
    fn test_busy_runner_does_not_panic() {
        let (mut c, runner) = controller(false, 2);
        c.on_line_started("l1".into());

        let _held = runner.borrow_mut();
        c.request_hurry_up();

        assert_eq!(c.diagnostics().count_code(DiagnosticCode::RunnerBusy), 1);
        assert_eq!(c.forwarded_count(), 0);
    }

    #[test]
    fn test_handle_signal_and_forward_count() {
        let (mut c, runner) = controller(false, 2);
        c.on_line_started("l1".into());
        for signal in AdvanceSignal::ALL {
            c.handle_signal(signal);
        }
        assert_eq!(c.forwarded_count(), 3);
        assert_eq!(
            runner.borrow().calls(),
            &[RunnerCall::HurryUpLine, RunnerCall::NextLine, RunnerCall::Stop]
        );
    }

    #[test]
    fn test_drain_diagnostics() {
        let mut c = LineAdvanceController::new(AdvancePolicy::default());
        c.request_hurry_up();
        assert_eq!(c.drain_diagnostics().len(), 1);
        assert!(c.diagnostics().is_empty());
    }
}
