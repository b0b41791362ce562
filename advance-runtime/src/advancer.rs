//! # Advancer 模块
//!
//! 宿主实际嵌入的行推进组件：一个 [`LineAdvanceController`]
//! 加一个 [`InputSourceAdapter`]，并实现 [`DialogueView`] 生命周期。
//!
//! ```text
//! 输入后端 ──► InputSourceAdapter ──AdvanceSignal──► LineAdvanceController ──► DialogueRunner
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::config::{AdvancerConfig, InputBinding, InputEnvironment, InputMode};
use crate::controller::{LineAdvanceController, SessionPhase};
use crate::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticResult};
use crate::input::{InputSourceAdapter, PolledInput, SharedActionSystem, SubscriptionId};
use crate::runner::DialogueRunner;
use crate::signal::AdvanceSignal;
use crate::view::{DialogueView, LineToken, LocalizedLine};

/// 行推进器
#[derive(Debug)]
pub struct LineAdvancer {
    controller: LineAdvanceController,
    adapter: InputSourceAdapter,
}

impl LineAdvancer {
    /// 按配置创建（未绑定 runner、未挂接动作系统）
    pub fn new(config: AdvancerConfig) -> Self {
        Self {
            controller: LineAdvanceController::new(config.policy),
            adapter: InputSourceAdapter::new(config.input, None),
        }
    }

    /// 绑定 runner（builder 形式）
    pub fn with_runner<R: DialogueRunner + 'static>(mut self, runner: &Rc<RefCell<R>>) -> Self {
        self.bind_runner(runner);
        self
    }

    /// 挂接动作系统（builder 形式）
    pub fn with_action_system(mut self, system: SharedActionSystem) -> Self {
        self.set_action_system(Some(system));
        self
    }

    /// 绑定 runner
    pub fn bind_runner<R: DialogueRunner + 'static>(&mut self, runner: &Rc<RefCell<R>>) {
        self.controller.bind_runner(runner);
    }

    /// 解除 runner 绑定
    pub fn unbind_runner(&mut self) {
        self.controller.unbind_runner();
    }

    /// 挂接或移除动作系统
    pub fn set_action_system(&mut self, system: Option<SharedActionSystem>) {
        self.adapter.set_action_system(system);
    }

    /// 切换输入绑定（Armed 时会拆除旧绑定并重新启用新绑定）
    pub fn set_input_binding(&mut self, binding: InputBinding) {
        self.adapter.set_binding(binding);
    }

    /// 当前输入模式
    pub fn input_mode(&self) -> InputMode {
        self.adapter.mode()
    }

    /// 控制器
    pub fn controller(&self) -> &LineAdvanceController {
        &self.controller
    }

    /// 输入适配器
    pub fn adapter(&self) -> &InputSourceAdapter {
        &self.adapter
    }

    //=========================================================================
    // 请求（None 模式或程序化控制直接调用）
    //=========================================================================

    /// 请求加速当前行（可能按策略升级为 next line）
    pub fn request_line_hurry_up(&mut self) {
        self.dispatch(AdvanceSignal::HurryUp);
    }

    /// 请求前进到下一行
    pub fn request_next_line(&mut self) {
        self.dispatch(AdvanceSignal::NextLine);
    }

    /// 请求停止整个对话
    pub fn request_dialogue_cancellation(&mut self) {
        self.dispatch(AdvanceSignal::CancelDialogue);
    }

    /// 派发一个信号
    pub fn dispatch(&mut self, signal: AdvanceSignal) {
        self.controller.handle_signal(signal);
        if self.controller.phase() == SessionPhase::Stopped && self.adapter.is_armed() {
            debug!("对话已取消，停止响应输入");
            self.adapter.disarm();
        }
    }

    //=========================================================================
    // 输入驱动
    //=========================================================================

    /// 每帧调用：轮询按键/输入轴并派发
    ///
    /// 返回本帧派发的信号数量。
    pub fn tick(&mut self, input: &dyn PolledInput) -> usize {
        let signals = self.adapter.poll(input);
        for signal in &signals {
            self.dispatch(*signal);
        }
        signals.len()
    }

    /// 动作系统回调
    ///
    /// 返回回调是否被识别并派发。
    pub fn on_action_performed(&mut self, subscription: SubscriptionId) -> bool {
        match self.adapter.resolve_action(subscription) {
            Some(signal) => {
                self.dispatch(signal);
                true
            }
            None => {
                debug!(subscription = subscription.0, "忽略无效的动作回调");
                false
            }
        }
    }

    //=========================================================================
    // 诊断
    //=========================================================================

    /// 针对宿主环境校验当前配置
    pub fn validate(&self, env: &InputEnvironment) -> DiagnosticResult {
        let mut result = crate::config::validate_input(self.adapter.binding(), env);
        if self.input_mode() == InputMode::Actions && !self.adapter.has_action_system() {
            result.push(
                Diagnostic::warn(DiagnosticCode::NoActionSystem, "动作模式下没有挂接动作系统")
                    .with_detail("调用 set_action_system 挂接动作系统，否则不会响应输入"),
            );
        }
        if !self.controller.has_runner() {
            result.push(Diagnostic::warn(
                DiagnosticCode::MissingRunner,
                "LineAdvancer 的 dialogue runner 为空",
            ));
        }
        result
    }

    /// 运行期累积的诊断
    pub fn diagnostics(&self) -> &DiagnosticResult {
        self.controller.diagnostics()
    }

    /// 取出运行期累积的诊断
    pub fn drain_diagnostics(&mut self) -> DiagnosticResult {
        self.controller.drain_diagnostics()
    }
}

impl DialogueView for LineAdvancer {
    fn on_dialogue_started(&mut self) {
        self.controller.begin_session();
        self.adapter.install();
    }

    fn on_dialogue_complete(&mut self) {
        self.adapter.uninstall();
        self.controller.end_session();
    }

    fn run_line(&mut self, line: &LocalizedLine) {
        if self.controller.on_line_started(line.id.clone()) {
            self.adapter.arm();
        }
    }

    fn on_line_complete(&mut self, line: &LineToken) {
        if self.controller.on_line_ended(line) {
            self.adapter.disarm();
        }
    }
}
