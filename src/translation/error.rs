//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。翻译客户端只对外暴露一个面向用户的
//! `ServiceUnavailable`，底层的传输异常和HTTP状态错误在重试路径内部流转。

use std::fmt;

use thiserror::Error;

/// 重试耗尽后展示给用户的统一提示
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "翻译服务不可用，请稍后重试";

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 重试耗尽后的服务错误
    #[error("{}", SERVICE_UNAVAILABLE_MESSAGE)]
    ServiceUnavailable,

    /// 请求过程中抛出的网络或解析异常
    #[error("传输异常: {0}")]
    Transport(String),

    /// 翻译端点返回非成功状态码
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),

    /// 端点返回的数据结构不符合预期
    #[error("响应格式无效: {0}")]
    InvalidResponse(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 设置存储读写错误
    #[error("设置存储错误: {0}")]
    SettingsError(String),

    /// 跨上下文消息通道已关闭
    #[error("消息通道已关闭: {0}")]
    ChannelClosed(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// IO错误
    #[error("IO错误: {0}")]
    IoError(String),
}

impl TranslationError {
    /// 检查错误是否会进入重试路径
    ///
    /// 翻译客户端据此决定是否重试：传输异常、HTTP状态错误（无论状态码高低）
    /// 和响应格式错误都会被重试，其余错误直接向上返回。
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::Transport(_) => true,
            TranslationError::HttpStatus(_) => true,
            TranslationError::InvalidResponse(_) => true,
            TranslationError::ServiceUnavailable => false,
            TranslationError::ConfigError(_) => false,
            TranslationError::SettingsError(_) => false,
            TranslationError::ChannelClosed(_) => false,
            TranslationError::InvalidInput(_) => false,
            TranslationError::ParseError(_) => false,
            TranslationError::IoError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ServiceUnavailable => ErrorSeverity::Error,
            TranslationError::Transport(_) => ErrorSeverity::Warning,
            TranslationError::HttpStatus(_) => ErrorSeverity::Warning,
            TranslationError::InvalidResponse(_) => ErrorSeverity::Warning,
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::SettingsError(_) => ErrorSeverity::Error,
            TranslationError::ChannelClosed(_) => ErrorSeverity::Error,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::IoError(_) => ErrorSeverity::Error,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        match &mut self {
            TranslationError::Transport(ref mut msg)
            | TranslationError::InvalidResponse(ref mut msg)
            | TranslationError::ConfigError(ref mut msg)
            | TranslationError::SettingsError(ref mut msg)
            | TranslationError::ChannelClosed(ref mut msg)
            | TranslationError::InvalidInput(ref mut msg)
            | TranslationError::ParseError(ref mut msg)
            | TranslationError::IoError(ref mut msg) => {
                *msg = format!("{} (上下文: {})", msg, context)
            }
            TranslationError::ServiceUnavailable | TranslationError::HttpStatus(_) => {}
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::ParseError(format!("JSON解析错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        TranslationError::Transport(error.to_string())
    }
}

impl From<url::ParseError> for TranslationError {
    fn from(error: url::ParseError) -> Self {
        TranslationError::InvalidInput(format!("URL无效: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误，不改变错误本身
    pub fn log_error(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }

    /// 创建设置存储错误
    pub fn settings_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::SettingsError(msg.to_string())
    }

    /// 创建输入验证错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::InvalidInput(msg.to_string())
    }
}
