//! 设置面板
//!
//! 读写用户设置并通知当前标签页。标签页不存在或已关闭时只记录日志。

use std::fmt;
use std::sync::Arc;

use url::Url;

use super::port::PagePort;
use super::protocol::RuntimeMessage;
use crate::translation::error::{helpers::validation_error, TranslationResult};
use crate::translation::storage::settings::{SettingsStore, TranslationSettings};

pub const STATUS_ENABLED: &str = "翻译已启用";
pub const STATUS_DISABLED: &str = "翻译已禁用";

/// 状态栏文字
pub fn status_text(is_enabled: bool) -> &'static str {
    if is_enabled {
        STATUS_ENABLED
    } else {
        STATUS_DISABLED
    }
}

/// 排除站点的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcludeOutcome {
    Excluded(String),
    AlreadyExcluded(String),
}

impl fmt::Display for ExcludeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExcludeOutcome::Excluded(host) => write!(f, "已排除网站: {}", host),
            ExcludeOutcome::AlreadyExcluded(_) => write!(f, "该网站已在排除列表中"),
        }
    }
}

/// 设置面板
pub struct SettingsPanel {
    settings: Arc<dyn SettingsStore>,
    tab: Option<PagePort>,
}

impl SettingsPanel {
    pub fn new(settings: Arc<dyn SettingsStore>, tab: Option<PagePort>) -> Self {
        Self { settings, tab }
    }

    /// 当前设置
    pub fn load(&self) -> TranslationResult<TranslationSettings> {
        self.settings.load()
    }

    pub fn status(&self) -> TranslationResult<&'static str> {
        Ok(status_text(self.settings.load()?.is_enabled))
    }

    /// 开关翻译并通知标签页
    pub fn set_enabled(&self, is_enabled: bool) -> TranslationResult<&'static str> {
        self.settings.update(&mut |settings: &mut TranslationSettings| {
            settings.is_enabled = is_enabled;
        })?;
        self.notify_tab(RuntimeMessage::toggle(is_enabled));
        Ok(status_text(is_enabled))
    }

    pub fn set_source_language(&self, language: &str) -> TranslationResult<()> {
        self.update_and_refresh(&mut |settings: &mut TranslationSettings| {
            settings.source_language = language.to_string();
        })
    }

    pub fn set_target_language(&self, language: &str) -> TranslationResult<()> {
        self.update_and_refresh(&mut |settings: &mut TranslationSettings| {
            settings.target_language = language.to_string();
        })
    }

    pub fn set_translate_service(&self, service: &str) -> TranslationResult<()> {
        self.update_and_refresh(&mut |settings: &mut TranslationSettings| {
            settings.translate_service = service.to_string();
        })
    }

    /// 把标签页的主机名加入排除列表，新加入时重新加载标签页
    pub fn exclude_site(&self, tab_url: &str) -> TranslationResult<ExcludeOutcome> {
        let url = Url::parse(tab_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| validation_error(format!("地址没有主机名: {}", tab_url)))?
            .to_string();

        let mut added = false;
        self.settings.update(&mut |settings: &mut TranslationSettings| {
            added = settings.exclude_site(&host);
        })?;

        if !added {
            return Ok(ExcludeOutcome::AlreadyExcluded(host));
        }

        if let Some(tab) = &self.tab {
            if let Err(error) = tab.reload() {
                tracing::debug!("标签页不可用: {}", error);
            }
        }
        Ok(ExcludeOutcome::Excluded(host))
    }

    /// 保存设置；启用状态下把完整的语言设置推送给标签页
    fn update_and_refresh(&self, apply: &mut dyn FnMut(&mut TranslationSettings)) -> TranslationResult<()> {
        let settings = self.settings.update(apply)?;
        if settings.is_enabled {
            self.notify_tab(RuntimeMessage::ToggleTranslation {
                is_enabled: true,
                source_language: Some(settings.source_language),
                target_language: Some(settings.target_language),
                translate_service: Some(settings.translate_service),
            });
        }
        Ok(())
    }

    fn notify_tab(&self, message: RuntimeMessage) {
        if let Some(tab) = &self.tab {
            if let Err(error) = tab.send(message) {
                tracing::debug!("标签页不可用: {}", error);
            }
        }
    }
}
