//! # Runner 模块
//!
//! 定义控制器与外部 DialogueRunner 之间的接缝。
//!
//! 控制器从不拥有 runner，只持有一个 `Weak` 回引用；
//! runner 被释放后所有请求都会变成可诊断的空操作。

use serde::{Deserialize, Serialize};

/// 外部对话运行器
///
/// 三个调用都是 fire-and-forget：控制器不关心返回值，也不等待其完成。
pub trait DialogueRunner {
    /// 请求所有行视图加速呈现当前行
    fn request_hurry_up_line(&mut self);

    /// 请求结束当前行并前进到下一行
    fn request_next_line(&mut self);

    /// 停止整个对话会话
    fn stop(&mut self);
}

/// 转发给 runner 的一次调用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunnerCall {
    /// `request_hurry_up_line()`
    HurryUpLine,
    /// `request_next_line()`
    NextLine,
    /// `stop()`
    Stop,
}

impl RunnerCall {
    /// 在 runner 上执行此调用
    pub fn apply(self, runner: &mut dyn DialogueRunner) {
        match self {
            Self::HurryUpLine => runner.request_hurry_up_line(),
            Self::NextLine => runner.request_next_line(),
            Self::Stop => runner.stop(),
        }
    }
}

impl std::fmt::Display for RunnerCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::HurryUpLine => "request_hurry_up_line",
            Self::NextLine => "request_next_line",
            Self::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// 记录所有调用的 runner
///
/// 用于无头宿主（脚本化测试驱动、回放工具）和测试。
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    calls: Vec<RunnerCall>,
}

impl RecordingRunner {
    /// 创建空的记录器
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录的调用（按到达顺序）
    pub fn calls(&self) -> &[RunnerCall] {
        &self.calls
    }

    /// 某种调用的次数
    pub fn count(&self, call: RunnerCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    /// 是否收到过 stop
    pub fn is_stopped(&self) -> bool {
        self.calls.contains(&RunnerCall::Stop)
    }

    /// 取出全部记录
    pub fn take_calls(&mut self) -> Vec<RunnerCall> {
        std::mem::take(&mut self.calls)
    }
}

impl DialogueRunner for RecordingRunner {
    fn request_hurry_up_line(&mut self) {
        self.calls.push(RunnerCall::HurryUpLine);
    }

    fn request_next_line(&mut self) {
        self.calls.push(RunnerCall::NextLine);
    }

    fn stop(&mut self) {
        self.calls.push(RunnerCall::Stop);
    }
}
