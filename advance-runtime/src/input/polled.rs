//! 轮询输入后端（按键 / 旧式输入轴）
//!
//! 每次 tick 检查三个绑定是否"刚刚按下"，只在 Armed 状态下轮询。

use std::collections::HashSet;

use super::SignalSource;
use crate::config::{AxisBindings, InputMode, KeyBindings, KeyCode};
use crate::signal::AdvanceSignal;

/// 宿主逐帧输入状态
pub trait PolledInput {
    /// 按键是否在本帧刚刚按下
    fn key_pressed(&self, key: &KeyCode) -> bool;

    /// 输入轴按钮是否在本帧刚刚按下
    fn button_pressed(&self, axis: &str) -> bool;
}

/// 一帧的输入快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameInput {
    keys: HashSet<KeyCode>,
    buttons: HashSet<String>,
}

impl FrameInput {
    /// 空帧（没有任何按下）
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个刚按下的键
    pub fn with_key(mut self, key: impl Into<KeyCode>) -> Self {
        self.press_key(key);
        self
    }

    /// 追加一个刚按下的输入轴按钮
    pub fn with_button(mut self, axis: impl Into<String>) -> Self {
        self.press_button(axis);
        self
    }

    /// 记录按键
    pub fn press_key(&mut self, key: impl Into<KeyCode>) {
        self.keys.insert(key.into());
    }

    /// 记录输入轴按钮
    pub fn press_button(&mut self, axis: impl Into<String>) {
        self.buttons.insert(axis.into());
    }

    /// 清空（进入下一帧）
    pub fn clear(&mut self) {
        self.keys.clear();
        self.buttons.clear();
    }
}

impl PolledInput for FrameInput {
    fn key_pressed(&self, key: &KeyCode) -> bool {
        self.keys.contains(key)
    }

    fn button_pressed(&self, axis: &str) -> bool {
        self.buttons.contains(axis)
    }
}

/// 按键信号源
pub struct KeySignalSource {
    bindings: KeyBindings,
}

impl KeySignalSource {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }
}

impl SignalSource for KeySignalSource {
    fn mode(&self) -> InputMode {
        InputMode::Keys
    }

    fn poll(&mut self, input: &dyn PolledInput, out: &mut Vec<AdvanceSignal>) {
        for signal in AdvanceSignal::ALL {
            if let Some(key) = self.bindings.binding(signal)
                && input.key_pressed(key)
            {
                out.push(signal);
            }
        }
    }
}

/// 旧式输入轴信号源
pub struct AxisSignalSource {
    bindings: AxisBindings,
}

impl AxisSignalSource {
    pub fn new(bindings: AxisBindings) -> Self {
        Self { bindings }
    }
}

impl SignalSource for AxisSignalSource {
    fn mode(&self) -> InputMode {
        InputMode::Axes
    }

    fn poll(&mut self, input: &dyn PolledInput, out: &mut Vec<AdvanceSignal>) {
        for signal in AdvanceSignal::ALL {
            if let Some(axis) = self.bindings.binding(signal)
                && input.button_pressed(axis)
            {
                out.push(signal);
            }
        }
    }
}
