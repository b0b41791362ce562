//! # Trace 模块
//!
//! 输入轨迹：一串按时间顺序排列的宿主事件，用于脚本化驱动 LineAdvancer。
//!
//! 回放时 runner 是 [`RecordingRunner`]，动作系统是 [`InputActionMap`]，
//! 结果是 runner 收到的全部调用和运行期诊断。

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use advance_runtime::{
    ActionId, AdvanceSignal, AdvancerConfig, DialogueOption, DialogueView, FrameInput,
    InputActionMap, InputBinding, LineAdvancer, LineToken, LocalizedLine, RecordingRunner,
    RunnerCall,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 轨迹事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// 对话开始
    DialogueStarted,
    /// 对话结束
    DialogueComplete,
    /// 一行开始
    LineStarted {
        id: String,
        #[serde(default)]
        text: String,
    },
    /// 一行结束
    LineComplete { id: String },
    /// 出现选项
    Options { options: Vec<DialogueOption> },
    /// 一帧输入（本帧刚按下的键和输入轴按钮）
    Tick {
        #[serde(default)]
        keys: Vec<String>,
        #[serde(default)]
        buttons: Vec<String>,
    },
    /// 动作触发
    Action { name: String },
    /// 宿主禁用动作（之后的触发不再回调）
    DisableAction { name: String },
    /// 宿主直接调用请求方法
    Request { signal: AdvanceSignal },
    /// 切换输入绑定
    SetInput { binding: InputBinding },
    /// 宿主释放 runner
    DropRunner,
}

/// 从 JSON 文件读取轨迹
pub fn load_trace(path: &Path) -> anyhow::Result<Vec<TraceEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取轨迹文件: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("轨迹解析失败: {}", path.display()))
}

/// 回放结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplayReport {
    /// 回放的事件数量
    pub events: usize,
    /// runner 收到的调用（按到达顺序）
    pub calls: Vec<RunnerCall>,
    /// runner 是否收到过 stop
    pub stopped: bool,
    /// 运行期诊断
    pub diagnostics: Vec<String>,
}

/// 回放轨迹
pub fn replay(config: AdvancerConfig, events: &[TraceEvent]) -> ReplayReport {
    let actions = InputActionMap::shared();
    let mut runner = Some(Rc::new(RefCell::new(RecordingRunner::new())));
    let mut advancer = LineAdvancer::new(config).with_action_system(actions.clone());
    if let Some(runner) = &runner {
        advancer.bind_runner(runner);
    }

    let mut report = ReplayReport {
        events: events.len(),
        ..ReplayReport::default()
    };

    for (index, event) in events.iter().enumerate() {
        debug!(index, event = ?event, "回放事件");
        match event {
            TraceEvent::DialogueStarted => advancer.on_dialogue_started(),
            TraceEvent::DialogueComplete => advancer.on_dialogue_complete(),
            TraceEvent::LineStarted { id, text } => {
                advancer.run_line(&LocalizedLine::new(id.as_str(), text.as_str()))
            }
            TraceEvent::LineComplete { id } => advancer.on_line_complete(&LineToken::new(id.as_str())),
            TraceEvent::Options { options } => {
                advancer.run_options(options);
            }
            TraceEvent::Tick { keys, buttons } => {
                let mut frame = FrameInput::new();
                for key in keys {
                    frame.press_key(key.as_str());
                }
                for button in buttons {
                    frame.press_button(button.as_str());
                }
                advancer.tick(&frame);
            }
            TraceEvent::Action { name } => {
                let fired = actions.borrow().perform(&ActionId::new(name.as_str()));
                for subscription in fired {
                    advancer.on_action_performed(subscription);
                }
            }
            TraceEvent::DisableAction { name } => {
                actions.borrow_mut().disable(&ActionId::new(name.as_str()));
            }
            TraceEvent::Request { signal } => advancer.dispatch(*signal),
            TraceEvent::SetInput { binding } => advancer.set_input_binding(binding.clone()),
            TraceEvent::DropRunner => {
                if let Some(runner) = runner.take() {
                    collect_calls(&mut report, &runner);
                }
            }
        }
    }

    if let Some(runner) = runner.take() {
        collect_calls(&mut report, &runner);
    }
    report.diagnostics = advancer
        .drain_diagnostics()
        .diagnostics
        .iter()
        .map(ToString::to_string)
        .collect();
    report
}

fn collect_calls(report: &mut ReplayReport, runner: &RefCell<RecordingRunner>) {
    let mut runner = runner.borrow_mut();
    report.stopped |= runner.is_stopped();
    report.calls.extend(runner.take_calls());
}
