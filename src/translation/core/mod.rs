//! 翻译系统核心模块
//!
//! - **客户端** (`client.rs`): 对翻译端点的调用，负责分块、并发与重试
//! - **会话** (`session.rs`): 一次页面翻译运行的全部状态及其启停
//!
//! ```text
//! TranslationSession (session.rs)
//!     ├── DomWalker (pipeline/walker.rs) ──▶ BackgroundPort ──▶ Translator (client.rs)
//!     ├── ChangeObserver (pipeline/observer.rs)
//!     ├── MarkerStore (pipeline/markers.rs)
//!     └── TranslationCache (storage/cache.rs)
//! ```

pub mod client;
pub mod session;

pub use client::{GoogleTranslateClient, Translator};
pub use session::TranslationSession;
