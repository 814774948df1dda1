//! 后台上下文
//!
//! 持有翻译客户端和设置存储：处理页面发来的翻译请求、安装时初始化默认设置、
//! 注册并响应"翻译选中的文本"右键菜单。

use std::sync::{Arc, Mutex};

use super::port::{BackgroundInbox, Envelope, PagePort};
use super::protocol::{ContextMenuItem, RuntimeMessage, TranslateResponse, TRANSLATE_SELECTION_MENU_ID};
use crate::translation::core::client::Translator;
use crate::translation::error::{helpers::log_error, TranslationResult};
use crate::translation::storage::settings::{install_defaults, SettingsStore};

/// 后台宿主
pub struct BackgroundHost {
    translator: Arc<dyn Translator>,
    settings: Arc<dyn SettingsStore>,
    menus: Mutex<Vec<ContextMenuItem>>,
}

impl BackgroundHost {
    pub fn new(translator: Arc<dyn Translator>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            translator,
            settings,
            menus: Mutex::new(Vec::new()),
        }
    }

    /// 安装事件：写入默认设置并注册右键菜单
    pub fn on_installed(&self) -> TranslationResult<()> {
        install_defaults(self.settings.as_ref())?;

        let item = ContextMenuItem::translate_selection();
        if let Ok(mut menus) = self.menus.lock() {
            if !menus.iter().any(|menu| menu.id == item.id) {
                tracing::debug!("注册右键菜单: {}", item.title);
                menus.push(item);
            }
        }
        Ok(())
    }

    /// 已注册的右键菜单
    pub fn context_menus(&self) -> Vec<ContextMenuItem> {
        self.menus.lock().map(|menus| menus.clone()).unwrap_or_default()
    }

    /// 翻译并生成应答
    pub async fn handle_translate(&self, text: &str, source_lang: &str, target_lang: &str) -> TranslateResponse {
        match self.translator.translate(text, source_lang, target_lang).await {
            Ok(translation) => TranslateResponse::ok(translation),
            Err(error) => {
                log_error(&error);
                TranslateResponse::failure(error.to_string())
            }
        }
    }

    /// 处理消息循环，每个翻译请求独立并发处理
    pub async fn serve(self: Arc<Self>, mut inbox: BackgroundInbox) {
        while let Some(Envelope { message, reply }) = inbox.recv().await {
            match message {
                RuntimeMessage::Translate {
                    text,
                    source_lang,
                    target_lang,
                } => {
                    let host = Arc::clone(&self);
                    tokio::spawn(async move {
                        let response = host.handle_translate(&text, &source_lang, &target_lang).await;
                        if let Some(reply) = reply {
                            // 页面可能已经关闭
                            let _ = reply.send(response);
                        }
                    });
                }
                other => tracing::trace!("后台忽略消息: {}", other.action()),
            }
        }
        tracing::debug!("后台消息通道已关闭");
    }

    /// 右键菜单点击
    pub async fn on_context_menu_clicked(&self, menu_item_id: &str, selection_text: &str, tab: &PagePort) {
        if menu_item_id == TRANSLATE_SELECTION_MENU_ID {
            self.translate_selection(selection_text, tab).await;
        }
    }

    /// 翻译选中文本并让页面展示结果，失败只记录日志
    pub async fn translate_selection(&self, selection_text: &str, tab: &PagePort) {
        let settings = match self.settings.load() {
            Ok(settings) => settings,
            Err(error) => {
                log_error(&error);
                return;
            }
        };

        match self
            .translator
            .translate(selection_text, &settings.source_language, &settings.target_language)
            .await
        {
            Ok(translation) => {
                let message = RuntimeMessage::ShowTranslation {
                    original_text: selection_text.to_string(),
                    translation,
                };
                if let Err(error) = tab.send(message) {
                    tracing::warn!("无法展示翻译结果: {}", error);
                }
            }
            Err(error) => tracing::error!("翻译失败: {}", error),
        }
    }
}
