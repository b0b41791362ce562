//! # Input 模块
//!
//! 输入源适配器：把当前唯一生效的输入后端的原始事件翻译成
//! [`AdvanceSignal`]，自身不含任何业务逻辑。
//!
//! ## 设计说明
//!
//! - 每种绑定族对应一个 [`SignalSource`] 实现，配置时选定
//! - 状态机：`Idle ──行开始──► Armed ──行结束──► Idle`
//! - 只有 Armed 状态下才轮询按键/输入轴、才接受动作回调
//! - 切换绑定时先拆除旧绑定族的全部订阅，再按当前状态重新安装/启用新的

pub mod action;
pub mod polled;

use tracing::debug;

use crate::config::{InputBinding, InputMode};
use crate::signal::AdvanceSignal;

pub use action::{ActionSignalSource, ActionSystem, InputActionMap, SharedActionSystem, SubscriptionId};
pub use polled::{AxisSignalSource, FrameInput, KeySignalSource, PolledInput};

/// 信号源：每种绑定族的统一能力
///
/// 生命周期：`install`（会话开始）→ `arm`（每行开始）→ `uninstall`（会话结束/切换绑定）。
pub trait SignalSource {
    /// 对应的输入模式
    fn mode(&self) -> InputMode;

    /// 安装订阅
    fn install(&mut self) {}

    /// 拆除全部订阅
    fn uninstall(&mut self) {}

    /// 行开始时启用输入
    fn arm(&mut self) {}

    /// 轮询本帧输入，按派发顺序追加信号
    fn poll(&mut self, _input: &dyn PolledInput, _out: &mut Vec<AdvanceSignal>) {}

    /// 把动作回调解析为信号；不属于本信号源的订阅返回 `None`
    fn resolve(&self, _subscription: SubscriptionId) -> Option<AdvanceSignal> {
        None
    }
}

/// None 模式：不订阅、不轮询
pub struct ManualSignalSource;

impl SignalSource for ManualSignalSource {
    fn mode(&self) -> InputMode {
        InputMode::None
    }
}

/// 适配器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdapterPhase {
    /// 没有活动行
    #[default]
    Idle,
    /// 行呈现中，输入生效
    Armed,
}

/// 输入源适配器
pub struct InputSourceAdapter {
    binding: InputBinding,
    source: Box<dyn SignalSource>,
    action_system: Option<SharedActionSystem>,
    installed: bool,
    phase: AdapterPhase,
}

impl std::fmt::Debug for InputSourceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSourceAdapter")
            .field("binding", &self.binding)
            .field("has_action_system", &self.action_system.is_some())
            .field("installed", &self.installed)
            .field("phase", &self.phase)
            .finish()
    }
}

impl InputSourceAdapter {
    /// 创建适配器（Idle，未安装）
    pub fn new(binding: InputBinding, action_system: Option<SharedActionSystem>) -> Self {
        let source = build_source(&binding, action_system.clone());
        Self {
            binding,
            source,
            action_system,
            installed: false,
            phase: AdapterPhase::Idle,
        }
    }

    /// 当前输入模式
    pub fn mode(&self) -> InputMode {
        self.source.mode()
    }

    /// 当前绑定
    pub fn binding(&self) -> &InputBinding {
        &self.binding
    }

    /// 当前状态
    pub fn phase(&self) -> AdapterPhase {
        self.phase
    }

    /// 是否处于 Armed
    pub fn is_armed(&self) -> bool {
        self.phase == AdapterPhase::Armed
    }

    /// 订阅是否已安装
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// 是否挂接了动作系统
    pub fn has_action_system(&self) -> bool {
        self.action_system.is_some()
    }

    /// 会话开始：安装订阅（重复调用无副作用）
    pub fn install(&mut self) {
        if !self.installed {
            self.source.install();
            self.installed = true;
        }
    }

    /// 会话结束：解除 Armed 并拆除订阅
    pub fn uninstall(&mut self) {
        self.disarm();
        if self.installed {
            self.source.uninstall();
            self.installed = false;
        }
    }

    /// 行开始：进入 Armed
    ///
    /// 宿主跳过了会话钩子时，这里会补装订阅。
    pub fn arm(&mut self) {
        self.install();
        self.source.arm();
        self.phase = AdapterPhase::Armed;
    }

    /// 行结束：回到 Idle
    pub fn disarm(&mut self) {
        self.phase = AdapterPhase::Idle;
    }

    /// 切换输入绑定
    ///
    /// 旧绑定族的订阅会先被全部拆除，然后按当前状态重新安装/启用新绑定。
    pub fn set_binding(&mut self, binding: InputBinding) {
        debug!(from = %self.binding.mode(), to = %binding.mode(), "切换输入绑定");
        self.binding = binding;
        self.rebuild();
    }

    /// 挂接（或替换）动作系统
    pub fn set_action_system(&mut self, action_system: Option<SharedActionSystem>) {
        self.action_system = action_system;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let was_installed = self.installed;
        let was_armed = self.is_armed();

        if self.installed {
            self.source.uninstall();
            self.installed = false;
        }
        self.source = build_source(&self.binding, self.action_system.clone());

        if was_installed {
            self.install();
        }
        if was_armed {
            self.arm();
        }
    }

    /// 轮询本帧输入
    ///
    /// Idle 状态下不轮询，直接返回空。
    pub fn poll(&mut self, input: &dyn PolledInput) -> Vec<AdvanceSignal> {
        let mut signals = Vec::new();
        if self.is_armed() {
            self.source.poll(input, &mut signals);
        }
        signals
    }

    /// 解析动作回调
    ///
    /// Idle 状态、或订阅不属于当前绑定族时返回 `None`。
    pub fn resolve_action(&self, subscription: SubscriptionId) -> Option<AdvanceSignal> {
        if !self.is_armed() {
            return None;
        }
        self.source.resolve(subscription)
    }
}

fn build_source(
    binding: &InputBinding,
    action_system: Option<SharedActionSystem>,
) -> Box<dyn SignalSource> {
    match binding {
        InputBinding::Actions(bindings) => {
            Box::new(ActionSignalSource::new(bindings.clone(), action_system))
        }
        InputBinding::Keys(bindings) => Box::new(KeySignalSource::new(bindings.clone())),
        InputBinding::Axes(bindings) => Box::new(AxisSignalSource::new(bindings.clone())),
        InputBinding::None => Box::new(ManualSignalSource),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionBindings, ActionId, KeyBindings};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn action_bindings() -> InputBinding {
        InputBinding::Actions(ActionBindings {
            hurry_up: Some("submit".into()),
            next_line: Some("skip".into()),
            cancel_dialogue: Some("menu".into()),
            enable_actions: true,
        })
    }

    fn action_adapter() -> (InputSourceAdapter, Rc<RefCell<InputActionMap>>) {
        let map = InputActionMap::shared();
        let adapter = InputSourceAdapter::new(action_bindings(), Some(map.clone()));
        (adapter, map)
    }

    #[test]
    fn test_idle_does_not_poll() {
        let mut adapter = InputSourceAdapter::new(InputBinding::Keys(KeyBindings::default()), None);
        let frame = FrameInput::new().with_key("Space");

        assert!(adapter.poll(&frame).is_empty());
        adapter.arm();
        assert_eq!(adapter.poll(&frame), vec![AdvanceSignal::HurryUp]);
        adapter.disarm();
        assert!(adapter.poll(&frame).is_empty());
    }

    #[test]
    fn test_none_mode_is_inert() {
        let mut adapter = InputSourceAdapter::new(InputBinding::None, None);
        adapter.arm();
        assert_eq!(adapter.mode(), InputMode::None);
        assert!(adapter.poll(&FrameInput::new().with_key("Space")).is_empty());
        assert_eq!(adapter.resolve_action(SubscriptionId(1)), None);
    }

    #[test]
    fn test_action_callbacks_only_while_armed() {
        let (mut adapter, map) = action_adapter();
        adapter.install();
        assert_eq!(map.borrow().total_subscriptions(), 3);

        adapter.arm();
        let ids = map.borrow().perform(&ActionId::new("skip"));
        assert_eq!(ids.len(), 1);
        assert_eq!(adapter.resolve_action(ids[0]), Some(AdvanceSignal::NextLine));

        adapter.disarm();
        assert_eq!(adapter.resolve_action(ids[0]), None);
    }

    #[test]
    fn test_uninstall_removes_subscriptions() {
        let (mut adapter, map) = action_adapter();
        adapter.arm();
        assert!(adapter.is_installed());
        adapter.uninstall();
        assert!(!adapter.is_installed());
        assert!(!adapter.is_armed());
        assert_eq!(map.borrow().total_subscriptions(), 0);
    }

    #[test]
    fn test_switch_binding_while_armed() {
        let (mut adapter, map) = action_adapter();
        adapter.install();
        adapter.arm();
        let old = map.borrow().perform(&ActionId::new("submit"));
        assert_eq!(old.len(), 1);

        adapter.set_binding(InputBinding::Keys(KeyBindings::default()));

        assert_eq!(adapter.mode(), InputMode::Keys);
        assert!(adapter.is_armed());
        assert!(adapter.is_installed());
        assert_eq!(map.borrow().total_subscriptions(), 0);
        assert!(map.borrow().perform(&ActionId::new("submit")).is_empty());
        assert_eq!(adapter.resolve_action(old[0]), None);
        assert_eq!(
            adapter.poll(&FrameInput::new().with_key("Escape")),
            vec![AdvanceSignal::NextLine]
        );
    }

    #[test]
    fn test_switch_back_to_actions_reinstalls() {
        let map = InputActionMap::shared();
        let mut adapter = InputSourceAdapter::new(
            InputBinding::Keys(KeyBindings::default()),
            Some(map.clone()),
        );
        adapter.install();
        adapter.arm();

        adapter.set_binding(action_bindings());
        assert_eq!(map.borrow().total_subscriptions(), 3);
        assert!(map.borrow().is_enabled(&ActionId::new("menu")));

        let ids = map.borrow().perform(&ActionId::new("menu"));
        assert_eq!(adapter.resolve_action(ids[0]), Some(AdvanceSignal::CancelDialogue));
    }

    #[test]
    fn test_attach_action_system_later() {
        let mut adapter = InputSourceAdapter::new(action_bindings(), None);
        adapter.install();
        assert!(!adapter.has_action_system());

        let map = InputActionMap::shared();
        adapter.set_action_system(Some(map.clone()));
        assert!(adapter.has_action_system());
        assert_eq!(map.borrow().total_subscriptions(), 3);
    }
}
