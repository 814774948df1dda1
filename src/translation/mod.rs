//! 翻译模块
//!
//! - **core**: 翻译客户端与页面翻译会话
//! - **pipeline**: 页面翻译管道（过滤、标记、遍历、插入观察）
//! - **storage**: 页面级缓存和持久化设置
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use page_translate::translation::{GoogleTranslateClient, TranslationConfig, Translator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GoogleTranslateClient::new(TranslationConfig::default())?;
//! let translation = client.translate("Hello world", "auto", "zh").await?;
//! println!("{}", translation);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 配置管理模块
///
/// 端点地址、分块大小、重试策略和设置文件位置
pub mod config;

/// 核心模块 - 翻译客户端与会话
pub mod core;

/// 错误处理模块 - 统一的错误类型和处理机制
pub mod error;

/// 页面翻译管道
pub mod pipeline;

/// 存储管理模块 - 翻译缓存与用户设置
pub mod storage;

// ============================================================================
// 公共API导出
// ============================================================================

pub use config::{ConfigManager, TranslationConfig};
pub use core::{GoogleTranslateClient, TranslationSession, Translator};
pub use error::{TranslationError, TranslationResult};
pub use pipeline::{DomWalker, LanguagePair, MarkerStore};
pub use storage::{
    install_defaults, CacheKey, CacheStats, JsonFileSettingsStore, MemorySettingsStore,
    SettingsStore, TranslationCache, TranslationSettings,
};
