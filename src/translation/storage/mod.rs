//! 存储模块
//!
//! 提供页面级翻译缓存和持久化的用户设置。

pub mod cache;
pub mod settings;

pub use cache::{CacheKey, CacheStats, TranslationCache};
pub use settings::{
    install_defaults, JsonFileSettingsStore, MemorySettingsStore, SettingsStore,
    TranslationSettings,
};
