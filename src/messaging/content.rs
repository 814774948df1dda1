//! 页面上下文
//!
//! `ContentAgent` 持有页面、页面级缓存和当前的翻译会话。它根据设置决定是否
//! 在加载时开始翻译，并响应设置面板和后台发来的消息。页面侧状态基于 `Rc`，
//! 所有方法都需要在 `LocalSet` 中调用。

use std::rc::Rc;
use std::sync::Arc;

use markup5ever_rcdom::Handle;

use super::port::{BackgroundPort, PageEvent, PageInbox};
use super::protocol::RuntimeMessage;
use crate::parsers::html::document::Page;
use crate::parsers::html::dom::{append_child, create_element, create_text_node};
use crate::translation::core::session::TranslationSession;
use crate::translation::error::TranslationResult;
use crate::translation::pipeline::walker::LanguagePair;
use crate::translation::storage::cache::TranslationCache;
use crate::translation::storage::settings::{SettingsStore, TranslationSettings};

/// 翻译结果弹窗的元素 id
pub const POPUP_ID: &str = "translate-popup";

const POPUP_STYLE: &str = "position: fixed; top: 50%; left: 50%; transform: translate(-50%, -50%); \
background-color: white; border: 1px solid #ccc; border-radius: 8px; \
box-shadow: 0 4px 12px rgba(0, 0, 0, 0.15); padding: 15px; max-width: 400px; \
max-height: 300px; overflow-y: auto; z-index: 999999; font-family: Arial, sans-serif;";
const POPUP_TITLE_STYLE: &str = "font-weight: bold; margin-bottom: 5px; font-size: 14px; color: #666;";
const POPUP_ORIGINAL_STYLE: &str =
    "margin-bottom: 10px; font-size: 14px; padding: 5px; background-color: #f5f5f5; border-radius: 4px;";
const POPUP_TRANSLATION_STYLE: &str =
    "font-size: 14px; padding: 5px; background-color: #e8f5e9; border-radius: 4px;";
const POPUP_CLOSE_STYLE: &str = "margin-top: 10px; padding: 5px 15px; background-color: #2196F3; \
color: white; border: none; border-radius: 4px; cursor: pointer; float: right;";

/// 页面代理
pub struct ContentAgent {
    page: Rc<Page>,
    port: BackgroundPort,
    settings: Arc<dyn SettingsStore>,
    cache: Rc<TranslationCache>,
    session: Option<TranslationSession>,
    last_languages: LanguagePair,
}

impl ContentAgent {
    pub fn new(page: Rc<Page>, port: BackgroundPort, settings: Arc<dyn SettingsStore>) -> Self {
        let defaults = TranslationSettings::default();
        Self {
            page,
            port,
            settings,
            cache: Rc::new(TranslationCache::new()),
            session: None,
            last_languages: LanguagePair::new(&defaults.source_language, &defaults.target_language),
        }
    }

    pub fn page(&self) -> &Rc<Page> {
        &self.page
    }

    pub fn cache(&self) -> &Rc<TranslationCache> {
        &self.cache
    }

    pub fn session(&self) -> Option<&TranslationSession> {
        self.session.as_ref()
    }

    pub fn is_translating(&self) -> bool {
        self.session.is_some()
    }

    /// 页面加载：启用且当前站点未被排除时开始翻译
    pub fn init(&mut self) -> TranslationResult<bool> {
        let settings = self.settings.load()?;
        let languages = LanguagePair::new(&settings.source_language, &settings.target_language);
        self.last_languages = languages.clone();

        if !settings.is_enabled {
            tracing::info!("翻译未启用");
            return Ok(false);
        }

        if let Some(host) = self.page.hostname() {
            if settings.is_site_excluded(&host) {
                tracing::info!("站点已被排除: {}", host);
                return Ok(false);
            }
        }

        Ok(self.start_translation(languages))
    }

    /// 处理一条运行时消息
    pub fn handle_message(&mut self, message: RuntimeMessage) {
        match message {
            RuntimeMessage::ToggleTranslation {
                is_enabled,
                source_language,
                target_language,
                ..
            } => {
                if is_enabled {
                    // 只带开关状态的消息沿用上一次的语言
                    let languages = LanguagePair::new(
                        source_language.as_deref().unwrap_or(&self.last_languages.source),
                        target_language.as_deref().unwrap_or(&self.last_languages.target),
                    );
                    self.start_translation(languages);
                } else {
                    self.stop_translation();
                }
            }
            RuntimeMessage::ShowTranslation {
                original_text,
                translation,
            } => {
                self.show_translation_popup(&original_text, &translation);
            }
            RuntimeMessage::Translate { .. } => tracing::trace!("页面忽略翻译请求消息"),
        }
    }

    /// 处理页面事件直到通道关闭
    pub async fn run(&mut self, mut inbox: PageInbox) {
        while let Some(event) = inbox.recv().await {
            match event {
                PageEvent::Message(message) => self.handle_message(message),
                PageEvent::Reload => {
                    if let Err(error) = self.reload() {
                        tracing::error!("页面重新加载失败: {}", error);
                    }
                }
            }
        }
    }

    /// 以指定语言开始翻译；相同语言下已在翻译时不做任何事
    pub fn start_translation(&mut self, languages: LanguagePair) -> bool {
        if let Some(session) = &self.session {
            if session.languages() == &languages {
                return false;
            }
        }

        self.stop_translation();
        self.last_languages = languages.clone();
        self.session = Some(TranslationSession::start(
            &self.page,
            languages,
            Rc::clone(&self.cache),
            self.port.clone(),
        ));
        true
    }

    /// 停止翻译并恢复原文，返回恢复的元素数量
    pub fn stop_translation(&mut self) -> usize {
        self.session.take().map_or(0, TranslationSession::stop)
    }

    /// 等待当前会话的在途翻译完成
    pub async fn settle(&self) {
        if let Some(session) = &self.session {
            session.settle().await;
        }
    }

    /// 重新加载：恢复原文、丢弃页面缓存，再按设置初始化
    pub fn reload(&mut self) -> TranslationResult<bool> {
        self.stop_translation();
        self.dismiss_translation_popup();
        self.cache = Rc::new(TranslationCache::new());
        self.init()
    }

    /// 展示翻译结果弹窗，替换已有的弹窗
    pub fn show_translation_popup(&self, original_text: &str, translation: &str) -> Option<Handle> {
        self.dismiss_translation_popup();
        let body = self.page.body()?;

        let popup = create_element(
            "div",
            &[("id", POPUP_ID), ("class", "notranslate"), ("style", POPUP_STYLE)],
        );
        append_block(&popup, POPUP_TITLE_STYLE, "原文:");
        append_block(&popup, POPUP_ORIGINAL_STYLE, original_text);
        append_block(&popup, POPUP_TITLE_STYLE, "译文:");
        append_block(&popup, POPUP_TRANSLATION_STYLE, translation);

        let close = create_element("button", &[("style", POPUP_CLOSE_STYLE)]);
        append_child(&close, &create_text_node("关闭"));
        append_child(&popup, &close);

        self.page.append_child(&body, &popup);
        Some(popup)
    }

    /// 关闭翻译结果弹窗
    pub fn dismiss_translation_popup(&self) -> bool {
        match self.page.get_element_by_id(POPUP_ID) {
            Some(popup) => {
                self.page.remove_child(&popup);
                true
            }
            None => false,
        }
    }
}

fn append_block(parent: &Handle, style: &str, text: &str) {
    let block = create_element("div", &[("style", style)]);
    append_child(&block, &create_text_node(text));
    append_child(parent, &block);
}
