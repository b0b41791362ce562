//! # Signal 模块
//!
//! 定义输入层向控制器传递的抽象推进信号。
//!
//! ## 设计说明
//!
//! - `AdvanceSignal` 是输入适配器采集用户操作后产生的语义化信号
//! - 控制器不直接处理按键/动作事件，只处理这三种信号
//! - 同一帧内产生的多个信号按 [`AdvanceSignal::ALL`] 的顺序派发

use serde::{Deserialize, Serialize};

/// 推进信号
///
/// # 设计说明
///
/// - `HurryUp`：请求加速（或直接完成）当前行的呈现，可能升级为 `NextLine`
/// - `NextLine`：请求结束当前行并前进到下一行
/// - `CancelDialogue`：请求停止整个对话会话
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvanceSignal {
    /// 加速当前行
    HurryUp,
    /// 前进到下一行
    NextLine,
    /// 取消整个对话
    CancelDialogue,
}

impl AdvanceSignal {
    /// 所有信号，按帧内派发顺序排列
    pub const ALL: [AdvanceSignal; 3] = [Self::HurryUp, Self::NextLine, Self::CancelDialogue];

    /// 信号名称（用于日志与诊断）
    pub fn name(self) -> &'static str {
        match self {
            Self::HurryUp => "hurry_up",
            Self::NextLine => "next_line",
            Self::CancelDialogue => "cancel_dialogue",
        }
    }
}

impl std::fmt::Display for AdvanceSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_order() {
        assert_eq!(
            AdvanceSignal::ALL,
            [
                AdvanceSignal::HurryUp,
                AdvanceSignal::NextLine,
                AdvanceSignal::CancelDialogue
            ]
        );
    }

    #[test]
    fn test_signal_serialization() {
        let json = serde_json::to_string(&AdvanceSignal::CancelDialogue).unwrap();
        assert_eq!(json, "\"CancelDialogue\"");
        let back: AdvanceSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AdvanceSignal::CancelDialogue);
    }

    #[test]
    fn test_display_uses_snake_case_name() {
        assert_eq!(AdvanceSignal::HurryUp.to_string(), "hurry_up");
    }
}
