//! 跨上下文消息
//!
//! 扩展的三个上下文在这里是进程内的参与者，通过 tokio 通道连接：
//!
//! - `background`: 后台宿主，持有翻译客户端，处理翻译请求与右键菜单
//! - `content`: 页面代理，持有页面与翻译会话
//! - `controls`: 设置面板
//! - `protocol` / `port`: 消息格式与请求/应答端口

pub mod background;
pub mod content;
pub mod controls;
pub mod port;
pub mod protocol;

pub use background::BackgroundHost;
pub use content::ContentAgent;
pub use controls::{ExcludeOutcome, SettingsPanel};
pub use port::{background_channel, page_channel, BackgroundPort, PageEvent, PagePort};
pub use protocol::{RuntimeMessage, TranslateResponse};
