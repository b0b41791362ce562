//! # Config 模块
//!
//! 行推进器的配置：推进策略 + 输入绑定。
//!
//! ## 配置来源
//!
//! 1. 宿主代码直接构造（最高）
//! 2. 配置文件（JSON，`AdvancerConfig::load`）
//! 3. 默认值（最低）
//!
//! 配置在一个会话内视为只读；切换输入绑定需要通过
//! [`LineAdvancer::set_input_binding`](crate::LineAdvancer::set_input_binding) 显式进行。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticResult};
use crate::error::{AdvanceResult, ConfigError};
use crate::signal::AdvanceSignal;

//=============================================================================
// 推进策略
//=============================================================================

/// 推进策略
///
/// 决定重复的 hurry up 请求是否会升级为 next line 请求。
///
/// 不变量：`advance_threshold >= 1`。反序列化时同样会校验。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAdvancePolicy")]
pub struct AdvancePolicy {
    multi_advance_is_cancel: bool,
    advance_threshold: u32,
}

#[derive(Deserialize)]
struct RawAdvancePolicy {
    #[serde(default)]
    multi_advance_is_cancel: bool,
    #[serde(default = "default_advance_threshold")]
    advance_threshold: u32,
}

impl TryFrom<RawAdvancePolicy> for AdvancePolicy {
    type Error = ConfigError;

    fn try_from(raw: RawAdvancePolicy) -> Result<Self, Self::Error> {
        Self::new(raw.multi_advance_is_cancel, raw.advance_threshold)
    }
}

impl AdvancePolicy {
    /// 创建推进策略
    ///
    /// `advance_threshold` 为 0 时返回 [`ConfigError::InvalidThreshold`]。
    pub fn new(multi_advance_is_cancel: bool, advance_threshold: u32) -> Result<Self, ConfigError> {
        if advance_threshold == 0 {
            return Err(ConfigError::InvalidThreshold {
                value: advance_threshold,
            });
        }
        Ok(Self {
            multi_advance_is_cancel,
            advance_threshold,
        })
    }

    /// 重复 hurry up 是否升级为 next line
    pub fn multi_advance_is_cancel(&self) -> bool {
        self.multi_advance_is_cancel
    }

    /// 升级所需的 hurry up 次数
    pub fn advance_threshold(&self) -> u32 {
        self.advance_threshold
    }

    /// 第 `count` 次 hurry up 是否应当升级
    pub fn escalates_at(&self, count: u32) -> bool {
        self.multi_advance_is_cancel && count >= self.advance_threshold
    }
}

impl Default for AdvancePolicy {
    fn default() -> Self {
        Self {
            multi_advance_is_cancel: false,
            advance_threshold: default_advance_threshold(),
        }
    }
}

//=============================================================================
// 输入绑定
//=============================================================================

/// 动作标识符（宿主动作系统中的动作名）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    /// 创建动作标识符
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// 动作名
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 按键标识符（宿主键盘层的键名，如 `"Space"`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(String);

impl KeyCode {
    /// 创建按键标识符
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// 空格键
    pub fn space() -> Self {
        Self::new("Space")
    }

    /// Esc 键
    pub fn escape() -> Self {
        Self::new("Escape")
    }

    /// 键名
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for KeyCode {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 动作绑定（事件驱动）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBindings {
    /// 触发 hurry up 的动作
    #[serde(default)]
    pub hurry_up: Option<ActionId>,

    /// 触发 next line 的动作
    #[serde(default)]
    pub next_line: Option<ActionId>,

    /// 触发取消对话的动作
    #[serde(default)]
    pub cancel_dialogue: Option<ActionId>,

    /// 行开始时是否启用上述动作
    #[serde(default = "default_enable_actions")]
    pub enable_actions: bool,
}

impl ActionBindings {
    /// 获取某个信号绑定的动作
    pub fn binding(&self, signal: AdvanceSignal) -> Option<&ActionId> {
        match signal {
            AdvanceSignal::HurryUp => self.hurry_up.as_ref(),
            AdvanceSignal::NextLine => self.next_line.as_ref(),
            AdvanceSignal::CancelDialogue => self.cancel_dialogue.as_ref(),
        }
    }
}

impl Default for ActionBindings {
    fn default() -> Self {
        Self {
            hurry_up: None,
            next_line: None,
            cancel_dialogue: None,
            enable_actions: default_enable_actions(),
        }
    }
}

/// 按键绑定（逐帧轮询）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    /// 触发 hurry up 的按键
    #[serde(default = "default_hurry_up_key")]
    pub hurry_up: Option<KeyCode>,

    /// 触发 next line 的按键
    #[serde(default = "default_next_line_key")]
    pub next_line: Option<KeyCode>,

    /// 触发取消对话的按键（默认不绑定）
    #[serde(default)]
    pub cancel_dialogue: Option<KeyCode>,
}

impl KeyBindings {
    /// 获取某个信号绑定的按键
    pub fn binding(&self, signal: AdvanceSignal) -> Option<&KeyCode> {
        match signal {
            AdvanceSignal::HurryUp => self.hurry_up.as_ref(),
            AdvanceSignal::NextLine => self.next_line.as_ref(),
            AdvanceSignal::CancelDialogue => self.cancel_dialogue.as_ref(),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            hurry_up: default_hurry_up_key(),
            next_line: default_next_line_key(),
            cancel_dialogue: None,
        }
    }
}

/// 旧式输入轴绑定（逐帧轮询）
///
/// 轴名为空字符串等同于未绑定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisBindings {
    /// 触发 hurry up 的轴
    #[serde(default = "default_hurry_up_axis")]
    pub hurry_up: Option<String>,

    /// 触发 next line 的轴
    #[serde(default = "default_next_line_axis")]
    pub next_line: Option<String>,

    /// 触发取消对话的轴（默认不绑定）
    #[serde(default)]
    pub cancel_dialogue: Option<String>,
}

impl AxisBindings {
    /// 获取某个信号绑定的轴名（空字符串视为未绑定）
    pub fn binding(&self, signal: AdvanceSignal) -> Option<&str> {
        let axis = match signal {
            AdvanceSignal::HurryUp => self.hurry_up.as_deref(),
            AdvanceSignal::NextLine => self.next_line.as_deref(),
            AdvanceSignal::CancelDialogue => self.cancel_dialogue.as_deref(),
        };
        axis.filter(|name| !name.is_empty())
    }
}

impl Default for AxisBindings {
    fn default() -> Self {
        Self {
            hurry_up: default_hurry_up_axis(),
            next_line: default_next_line_axis(),
            cancel_dialogue: None,
        }
    }
}

/// 输入模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// 宿主动作系统（事件驱动）
    Actions,
    /// 键盘按键（逐帧轮询）
    Keys,
    /// 旧式输入轴（逐帧轮询）
    Axes,
    /// 不响应任何输入，由宿主直接调用请求方法
    None,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Actions => "actions",
            Self::Keys => "keys",
            Self::Axes => "axes",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// 输入绑定
///
/// 同一时刻只有一种绑定族生效。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InputBinding {
    /// 动作绑定
    Actions(ActionBindings),
    /// 按键绑定
    Keys(KeyBindings),
    /// 旧式输入轴绑定
    Axes(AxisBindings),
    /// 无输入绑定
    None,
}

impl InputBinding {
    /// 当前绑定对应的输入模式
    pub fn mode(&self) -> InputMode {
        match self {
            Self::Actions(_) => InputMode::Actions,
            Self::Keys(_) => InputMode::Keys,
            Self::Axes(_) => InputMode::Axes,
            Self::None => InputMode::None,
        }
    }
}

impl Default for InputBinding {
    fn default() -> Self {
        Self::Keys(KeyBindings::default())
    }
}

//=============================================================================
// 宿主环境
//=============================================================================

/// 宿主输入环境能力
///
/// 用于配置校验：描述宿主中哪些输入后端可用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEnvironment {
    /// 是否安装了动作系统
    #[serde(default = "default_true")]
    pub action_system_installed: bool,

    /// 动作系统是否已启用
    #[serde(default = "default_true")]
    pub action_system_enabled: bool,

    /// 旧式输入管理器是否已启用
    #[serde(default = "default_true")]
    pub legacy_input_enabled: bool,
}

impl Default for InputEnvironment {
    fn default() -> Self {
        Self {
            action_system_installed: true,
            action_system_enabled: true,
            legacy_input_enabled: true,
        }
    }
}

/// 校验输入模式与宿主环境是否匹配
///
/// 结果只包含 Info/Warn，不会阻止组件运行。
pub fn validate_input(binding: &InputBinding, env: &InputEnvironment) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();

    match binding.mode() {
        InputMode::None => {
            result.push(
                Diagnostic::info(
                    DiagnosticCode::ManualInput,
                    "输入模式为 none，需要宿主直接调用请求方法",
                )
                .with_detail(
                    "request_line_hurry_up() / request_next_line() / request_dialogue_cancellation()",
                ),
            );
        }
        InputMode::Axes if !env.legacy_input_enabled => {
            result.push(
                Diagnostic::warn(DiagnosticCode::BackendUnavailable, "旧式输入管理器未启用")
                    .with_detail("改用 actions 模式，或在宿主中启用旧式输入管理器"),
            );
        }
        InputMode::Actions if !env.action_system_installed => {
            result.push(
                Diagnostic::warn(DiagnosticCode::BackendUnavailable, "未安装动作系统")
                    .with_detail("请为宿主安装动作输入系统"),
            );
        }
        InputMode::Actions if !env.action_system_enabled => {
            result.push(
                Diagnostic::warn(DiagnosticCode::BackendUnavailable, "动作系统未启用")
                    .with_detail("改用其他输入模式，或在宿主中启用动作系统"),
            );
        }
        _ => {}
    }

    result
}

//=============================================================================
// 完整配置
//=============================================================================

/// 行推进器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancerConfig {
    /// 推进策略
    #[serde(default)]
    pub policy: AdvancePolicy,

    /// 输入绑定
    #[serde(default)]
    pub input: InputBinding,
}

impl AdvancerConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = ?path, "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match Self::load_strict(path) {
            Ok(config) => {
                info!(path = ?path, "配置文件加载成功");
                config
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "配置文件加载失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 加载配置文件，失败时返回错误
    pub fn load_strict(path: impl AsRef<Path>) -> AdvanceResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// 从 JSON 文本解析配置
    pub fn from_json(content: &str) -> AdvanceResult<Self> {
        let config = serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> AdvanceResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
        })?;

        fs::write(path, json).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// 针对宿主环境校验配置
    pub fn validate(&self, env: &InputEnvironment) -> DiagnosticResult {
        validate_input(&self.input, env)
    }
}

// 默认值函数
fn default_advance_threshold() -> u32 {
    2
}

fn default_enable_actions() -> bool {
    true
}

fn default_hurry_up_key() -> Option<KeyCode> {
    Some(KeyCode::space())
}

fn default_next_line_key() -> Option<KeyCode> {
    Some(KeyCode::escape())
}

fn default_hurry_up_axis() -> Option<String> {
    Some("Jump".to_string())
}

fn default_next_line_axis() -> Option<String> {
    Some("Cancel".to_string())
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticLevel;
    use crate::error::AdvanceError;

    #[test]
    fn test_default_config() {
        let config = AdvancerConfig::default();
        assert!(!config.policy.multi_advance_is_cancel());
        assert_eq!(config.policy.advance_threshold(), 2);
        assert_eq!(config.input.mode(), InputMode::Keys);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        assert_eq!(
            AdvancePolicy::new(true, 0),
            Err(ConfigError::InvalidThreshold { value: 0 })
        );
        assert!(AdvancePolicy::new(true, 1).is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected_when_deserializing() {
        let err = AdvancerConfig::from_json(r#"{"policy": {"advance_threshold": 0}}"#);
        assert!(matches!(
            err,
            Err(AdvanceError::Config(ConfigError::Parse { .. }))
        ));
    }

    #[test]
    fn test_escalation_predicate() {
        let policy = AdvancePolicy::new(true, 3).unwrap();
        assert!(!policy.escalates_at(2));
        assert!(policy.escalates_at(3));
        assert!(policy.escalates_at(4));

        let off = AdvancePolicy::new(false, 1).unwrap();
        assert!(!off.escalates_at(100));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AdvancerConfig::from_json(r#"{"input": {"mode": "axes"}}"#).unwrap();
        let InputBinding::Axes(axes) = &config.input else {
            panic!("expected axes binding");
        };
        assert_eq!(axes.binding(AdvanceSignal::HurryUp), Some("Jump"));
        assert_eq!(axes.binding(AdvanceSignal::NextLine), Some("Cancel"));
        assert_eq!(axes.binding(AdvanceSignal::CancelDialogue), None);
        assert_eq!(config.policy, AdvancePolicy::default());
    }

    #[test]
    fn test_empty_axis_name_is_unbound() {
        let axes = AxisBindings {
            hurry_up: Some(String::new()),
            ..AxisBindings::default()
        };
        assert_eq!(axes.binding(AdvanceSignal::HurryUp), None);
    }

    #[test]
    fn test_actions_binding_json() {
        let json = r#"{
            "policy": {"multi_advance_is_cancel": true, "advance_threshold": 3},
            "input": {"mode": "actions", "hurry_up": "submit", "cancel_dialogue": "menu"}
        }"#;
        let config = AdvancerConfig::from_json(json).unwrap();
        let InputBinding::Actions(actions) = &config.input else {
            panic!("expected actions binding");
        };
        assert_eq!(actions.hurry_up, Some(ActionId::new("submit")));
        assert_eq!(actions.next_line, None);
        assert!(actions.enable_actions);
        assert!(config.policy.multi_advance_is_cancel());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("advancer.json");

        let config = AdvancerConfig {
            policy: AdvancePolicy::new(true, 4).unwrap(),
            input: InputBinding::None,
        };
        config.save(&path).unwrap();

        assert_eq!(AdvancerConfig::load_strict(&path).unwrap(), config);
        assert_eq!(AdvancerConfig::load(&path), config);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert_eq!(AdvancerConfig::load(&path), AdvancerConfig::default());
        assert!(matches!(
            AdvancerConfig::load_strict(&path),
            Err(AdvanceError::Config(ConfigError::Io { .. }))
        ));
    }

    #[test]
    fn test_validate_none_mode_is_info() {
        let result = validate_input(&InputBinding::None, &InputEnvironment::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result.diagnostics[0].level, DiagnosticLevel::Info);
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::ManualInput);
    }

    #[test]
    fn test_validate_backend_unavailable() {
        let env = InputEnvironment {
            action_system_installed: false,
            action_system_enabled: false,
            legacy_input_enabled: false,
        };

        let actions = validate_input(&InputBinding::Actions(ActionBindings::default()), &env);
        assert_eq!(actions.warn_count(), 1);
        assert_eq!(actions.diagnostics[0].message, "未安装动作系统");

        let axes = validate_input(&InputBinding::Axes(AxisBindings::default()), &env);
        assert_eq!(axes.count_code(DiagnosticCode::BackendUnavailable), 1);

        let keys = validate_input(&InputBinding::Keys(KeyBindings::default()), &env);
        assert!(keys.is_empty());
    }

    #[test]
    fn test_validate_action_system_disabled() {
        let env = InputEnvironment {
            action_system_enabled: false,
            ..InputEnvironment::default()
        };
        let result = validate_input(&InputBinding::Actions(ActionBindings::default()), &env);
        assert_eq!(result.diagnostics[0].message, "动作系统未启用");
    }
}
