//! # Advance Runtime
//!
//! 对话行推进协议的核心库。
//!
//! ## 架构概述
//!
//! `advance-runtime` 是纯逻辑核心，不依赖任何引擎或输入系统。
//! 宿主把输入后端、对话视图生命周期和 DialogueRunner 接到它上面：
//!
//! ```text
//! Host 输入后端                  advance-runtime                     Host
//!   │                                 │                                │
//!   │── 按键 / 输入轴 / 动作回调 ────►│ InputSourceAdapter             │
//!   │                                 │   │ AdvanceSignal              │
//!   │                                 │   ▼                            │
//!   │                                 │ LineAdvanceController ────────►│ DialogueRunner
//!   │                                 │   (计数 / 升级 / 取消)         │ hurry up / next / stop
//! ```
//!
//! ## 核心类型
//!
//! - [`LineAdvancer`]：宿主嵌入的组件，实现 [`DialogueView`]
//! - [`LineAdvanceController`]：按策略转发 hurry up / next line / stop
//! - [`InputSourceAdapter`]：把当前输入后端翻译成 [`AdvanceSignal`]
//! - [`AdvancerConfig`]：推进策略 + 输入绑定
//!
//! ## 使用示例
//!
//! ```ignore
//! use advance_runtime::{AdvancerConfig, DialogueView, FrameInput, LineAdvancer, LocalizedLine};
//!
//! let runner = Rc::new(RefCell::new(MyRunner::new()));
//! let mut advancer = LineAdvancer::new(AdvancerConfig::load("advancer.json")).with_runner(&runner);
//!
//! advancer.on_dialogue_started();
//! advancer.run_line(&LocalizedLine::new("line:intro", "你好"));
//!
//! // 主循环
//! loop {
//!     let frame = collect_frame_input();
//!     advancer.tick(&frame);
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`signal`]：AdvanceSignal 定义
//! - [`config`]：AdvancePolicy、InputBinding、AdvancerConfig
//! - [`controller`]：LineAdvanceController
//! - [`input`]：InputSourceAdapter 及各输入后端
//! - [`runner`]：DialogueRunner 接缝
//! - [`view`]：对话视图生命周期
//! - [`diagnostic`]：诊断通道
//! - [`error`]：错误类型定义

pub mod advancer;
pub mod config;
pub mod controller;
pub mod diagnostic;
pub mod error;
pub mod input;
pub mod runner;
pub mod signal;
pub mod view;

// 重导出核心类型
pub use advancer::LineAdvancer;
pub use config::{
    ActionBindings, ActionId, AdvancePolicy, AdvancerConfig, AxisBindings, InputBinding,
    InputEnvironment, InputMode, KeyBindings, KeyCode, validate_input,
};
pub use controller::{AdvanceState, LineAdvanceController, SessionPhase};
pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticLevel, DiagnosticResult};
pub use error::{AdvanceError, AdvanceResult, ConfigError};
pub use input::{
    ActionSystem, AdapterPhase, FrameInput, InputActionMap, InputSourceAdapter, PolledInput,
    SharedActionSystem, SignalSource, SubscriptionId,
};
pub use runner::{DialogueRunner, RecordingRunner, RunnerCall};
pub use signal::AdvanceSignal;
pub use view::{DialogueOption, DialogueView, LineToken, LocalizedLine};
