//! # Page Translate Library
//!
//! 自动翻译HTML页面正文的工具库：遍历文档中的可见文本，经由后台翻译服务替换为
//! 目标语言，并记录原文以便随时恢复。
//!
//! ## 模块组织
//!
//! - `core` - 页面读取与翻译流水线入口
//! - `env` - 环境变量定义
//! - `messaging` - 后台、页面与设置面板之间的消息协议
//! - `parsers` - HTML 文档模型与序列化
//! - `translation` - 翻译客户端、DOM遍历、缓存与设置存储

pub mod core;
pub mod env;
pub mod messaging;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use core::*;
pub use translation::{TranslationError, TranslationResult};
