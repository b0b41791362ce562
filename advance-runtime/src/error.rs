//! # Error 模块
//!
//! 定义 advance-runtime 中使用的错误类型。
//!
//! 请求类操作（hurry up / next line / cancel）永远不返回错误，
//! 只会记录诊断；真正的错误只出现在配置边界上。

use thiserror::Error;

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 推进阈值必须至少为 1
    #[error("advance_threshold 必须 >= 1，实际为 {value}")]
    InvalidThreshold { value: u32 },

    /// 配置文件读写失败
    #[error("配置 IO 错误 ({path}): {message}")]
    Io { path: String, message: String },

    /// 配置文件解析失败
    #[error("配置解析失败: {message}")]
    Parse { message: String },

    /// 配置序列化失败
    #[error("配置序列化失败: {message}")]
    Serialize { message: String },
}

/// advance-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdvanceError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// Result 类型别名
pub type AdvanceResult<T> = Result<T, AdvanceError>;
