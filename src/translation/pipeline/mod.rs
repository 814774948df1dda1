//! 页面翻译管道
//!
//! 过滤规则、元素标记、DOM 遍历和插入观察者

pub mod filters;
pub mod markers;
pub mod observer;
pub mod walker;

pub use markers::MarkerStore;
pub use observer::ChangeObserver;
pub use walker::{DomWalker, LanguagePair, WalkerContext};
