//! 上下文之间的消息端口
//!
//! 后台端口是请求/应答式的：`translate` 通过 oneshot 通道返回应答，
//! 其余消息不等待应答。页面端口只投递消息。

use tokio::sync::{mpsc, oneshot};

use super::protocol::{RuntimeMessage, TranslateResponse};
use crate::translation::error::{TranslationError, TranslationResult, SERVICE_UNAVAILABLE_MESSAGE};

/// 投递给后台的消息
#[derive(Debug)]
pub struct Envelope {
    pub message: RuntimeMessage,
    pub reply: Option<oneshot::Sender<TranslateResponse>>,
}

pub type BackgroundInbox = mpsc::UnboundedReceiver<Envelope>;

/// 页面侧持有的后台端口
#[derive(Debug, Clone)]
pub struct BackgroundPort {
    tx: mpsc::UnboundedSender<Envelope>,
}

/// 创建后台通道
pub fn background_channel() -> (BackgroundPort, BackgroundInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BackgroundPort { tx }, rx)
}

impl BackgroundPort {
    /// 发送消息并等待应答
    pub async fn request(&self, message: RuntimeMessage) -> TranslationResult<TranslateResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                message,
                reply: Some(reply_tx),
            })
            .map_err(|_| TranslationError::ChannelClosed("后台上下文不可用".to_string()))?;

        reply_rx
            .await
            .map_err(|_| TranslationError::ChannelClosed("后台未返回应答".to_string()))
    }

    /// 请求后台翻译文本
    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<String> {
        let response = self
            .request(RuntimeMessage::Translate {
                text: text.to_string(),
                source_lang: source_lang.to_string(),
                target_lang: target_lang.to_string(),
            })
            .await?;

        if response.success {
            return Ok(response.translation.unwrap_or_default());
        }

        match response.error {
            Some(error) if error == SERVICE_UNAVAILABLE_MESSAGE => {
                Err(TranslationError::ServiceUnavailable)
            }
            Some(error) => Err(TranslationError::Transport(error)),
            None => Err(TranslationError::InvalidResponse("缺少错误信息".to_string())),
        }
    }

    /// 投递不需要应答的消息
    pub fn send(&self, message: RuntimeMessage) -> TranslationResult<()> {
        self.tx
            .send(Envelope { message, reply: None })
            .map_err(|_| TranslationError::ChannelClosed("后台上下文不可用".to_string()))
    }
}

/// 投递给页面的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Message(RuntimeMessage),
    /// 标签页重新加载
    Reload,
}

pub type PageInbox = mpsc::UnboundedReceiver<PageEvent>;

/// 后台和设置面板持有的页面端口
#[derive(Debug, Clone)]
pub struct PagePort {
    tx: mpsc::UnboundedSender<PageEvent>,
}

/// 创建页面通道
pub fn page_channel() -> (PagePort, PageInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PagePort { tx }, rx)
}

impl PagePort {
    pub fn send(&self, message: RuntimeMessage) -> TranslationResult<()> {
        self.tx
            .send(PageEvent::Message(message))
            .map_err(|_| TranslationError::ChannelClosed("页面上下文不可用".to_string()))
    }

    pub fn reload(&self) -> TranslationResult<()> {
        self.tx
            .send(PageEvent::Reload)
            .map_err(|_| TranslationError::ChannelClosed("页面上下文不可用".to_string()))
    }
}
