//! # View 模块
//!
//! 对话视图生命周期。
//!
//! 宿主的 DialogueRunner 在对话开始/结束、每行开始/结束、出现选项时
//! 调用这些钩子。钩子都是同步的：没有挂起，调用返回即视为完成。

use serde::{Deserialize, Serialize};

/// 行标识（由 runner 提供的不透明令牌）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineToken(String);

impl LineToken {
    /// 创建行标识
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 行 ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LineToken {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for LineToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 本地化后的对话行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedLine {
    /// 行标识
    pub id: LineToken,
    /// 行文本
    pub text: String,
    /// 说话者（None 表示旁白）
    #[serde(default)]
    pub character_name: Option<String>,
}

impl LocalizedLine {
    /// 创建对话行
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: LineToken::new(id),
            text: text.into(),
            character_name: None,
        }
    }

    /// 设置说话者
    pub fn with_character(mut self, name: impl Into<String>) -> Self {
        self.character_name = Some(name.into());
        self
    }
}

/// 对话选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueOption {
    /// 选项索引
    pub index: usize,
    /// 选项文本
    pub text: String,
    /// 是否可选
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// 对话视图
///
/// 除 `run_line` 外的钩子都有空的默认实现。
pub trait DialogueView {
    /// 对话开始
    fn on_dialogue_started(&mut self) {}

    /// 对话结束（正常结束或被取消）
    fn on_dialogue_complete(&mut self) {}

    /// 开始呈现一行
    fn run_line(&mut self, line: &LocalizedLine);

    /// 一行呈现结束
    fn on_line_complete(&mut self, _line: &LineToken) {}

    /// 呈现选项
    ///
    /// 返回选中的选项索引；不参与选择的视图返回 `None`。
    fn run_options(&mut self, _options: &[DialogueOption]) -> Option<usize> {
        None
    }
}
