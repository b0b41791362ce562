//! 动作输入后端（事件驱动）
//!
//! 会话开始时订阅三个动作，行开始时启用动作，会话结束时取消订阅。
//! 宿主在动作触发时回调 `on_action_performed(subscription)`，
//! 适配器只认当前绑定族的有效订阅。

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SignalSource;
use crate::config::{ActionBindings, ActionId, InputMode};
use crate::signal::AdvanceSignal;

/// 订阅句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// 宿主动作系统
pub trait ActionSystem {
    /// 订阅动作的 performed 回调
    fn subscribe(&mut self, action: &ActionId) -> SubscriptionId;

    /// 取消订阅
    fn unsubscribe(&mut self, subscription: SubscriptionId);

    /// 启用动作
    fn enable(&mut self, action: &ActionId);
}

/// 共享的动作系统句柄
pub type SharedActionSystem = Rc<RefCell<dyn ActionSystem>>;

#[derive(Debug, Default)]
struct ActionEntry {
    enabled: bool,
    subscribers: Vec<SubscriptionId>,
}

/// 内存中的动作表
///
/// 无头宿主和测试使用的 [`ActionSystem`] 实现：
/// 动作未启用时 `perform` 不会回调任何订阅者。
#[derive(Debug, Default)]
pub struct InputActionMap {
    next_id: u64,
    actions: BTreeMap<ActionId, ActionEntry>,
}

impl InputActionMap {
    /// 创建空动作表
    pub fn new() -> Self {
        Self::default()
    }

    /// 包装为共享句柄
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// 动作是否已启用
    pub fn is_enabled(&self, action: &ActionId) -> bool {
        self.actions.get(action).is_some_and(|entry| entry.enabled)
    }

    /// 禁用动作
    pub fn disable(&mut self, action: &ActionId) {
        if let Some(entry) = self.actions.get_mut(action) {
            entry.enabled = false;
        }
    }

    /// 全部订阅数量
    pub fn total_subscriptions(&self) -> usize {
        self.actions.values().map(|e| e.subscribers.len()).sum()
    }

    /// 触发动作，返回需要回调的订阅
    pub fn perform(&self, action: &ActionId) -> Vec<SubscriptionId> {
        match self.actions.get(action) {
            Some(entry) if entry.enabled => entry.subscribers.clone(),
            _ => Vec::new(),
        }
    }
}

impl ActionSystem for InputActionMap {
    fn subscribe(&mut self, action: &ActionId) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.actions
            .entry(action.clone())
            .or_default()
            .subscribers
            .push(id);
        id
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        for entry in self.actions.values_mut() {
            entry.subscribers.retain(|id| *id != subscription);
        }
    }

    fn enable(&mut self, action: &ActionId) {
        self.actions.entry(action.clone()).or_default().enabled = true;
    }
}

/// 动作信号源
pub struct ActionSignalSource {
    bindings: ActionBindings,
    system: Option<SharedActionSystem>,
    subscriptions: Vec<(SubscriptionId, AdvanceSignal)>,
}

impl ActionSignalSource {
    pub fn new(bindings: ActionBindings, system: Option<SharedActionSystem>) -> Self {
        Self {
            bindings,
            system,
            subscriptions: Vec::new(),
        }
    }
}

impl SignalSource for ActionSignalSource {
    fn mode(&self) -> InputMode {
        InputMode::Actions
    }

    fn install(&mut self) {
        let Some(system) = &self.system else {
            return;
        };
        let mut system = system.borrow_mut();
        for signal in AdvanceSignal::ALL {
            if let Some(action) = self.bindings.binding(signal) {
                let id = system.subscribe(action);
                debug!(action = %action, signal = %signal, subscription = id.0, "订阅动作");
                self.subscriptions.push((id, signal));
            }
        }
    }

    fn uninstall(&mut self) {
        let subscriptions = std::mem::take(&mut self.subscriptions);
        let Some(system) = &self.system else {
            return;
        };
        let mut system = system.borrow_mut();
        for (id, _) in subscriptions {
            system.unsubscribe(id);
        }
    }

    fn arm(&mut self) {
        if !self.bindings.enable_actions {
            return;
        }
        let Some(system) = &self.system else {
            return;
        };
        let mut system = system.borrow_mut();
        for signal in AdvanceSignal::ALL {
            if let Some(action) = self.bindings.binding(signal) {
                system.enable(action);
            }
        }
    }

    fn resolve(&self, subscription: SubscriptionId) -> Option<AdvanceSignal> {
        self.subscriptions
            .iter()
            .find(|(id, _)| *id == subscription)
            .map(|(_, signal)| *signal)
    }
}
