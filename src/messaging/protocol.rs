//! 跨上下文消息协议
//!
//! 每条消息带 `action` 判别字段，字段名与扩展运行时的 JSON 保持一致。

use serde::{Deserialize, Serialize};

/// 右键菜单项的 id
pub const TRANSLATE_SELECTION_MENU_ID: &str = "translate-selection";
/// 右键菜单项的标题
pub const TRANSLATE_SELECTION_MENU_TITLE: &str = "翻译选中的文本";

/// 运行时消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum RuntimeMessage {
    /// 页面请求后台翻译一段文本，需要应答
    #[serde(rename = "translate", rename_all = "camelCase")]
    Translate {
        text: String,
        source_lang: String,
        target_lang: String,
    },

    /// 设置变化后开关页面翻译，无应答
    #[serde(rename = "toggleTranslation", rename_all = "camelCase")]
    ToggleTranslation {
        is_enabled: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        translate_service: Option<String>,
    },

    /// 展示选中文本的翻译结果，无应答
    #[serde(rename = "show-translation", rename_all = "camelCase")]
    ShowTranslation {
        original_text: String,
        translation: String,
    },
}

impl RuntimeMessage {
    pub fn action(&self) -> &'static str {
        match self {
            RuntimeMessage::Translate { .. } => "translate",
            RuntimeMessage::ToggleTranslation { .. } => "toggleTranslation",
            RuntimeMessage::ShowTranslation { .. } => "show-translation",
        }
    }

    /// 仅携带开关状态的切换消息
    pub fn toggle(is_enabled: bool) -> Self {
        RuntimeMessage::ToggleTranslation {
            is_enabled,
            source_language: None,
            target_language: None,
            translate_service: None,
        }
    }
}

/// `translate` 消息的应答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranslateResponse {
    pub fn ok(translation: String) -> Self {
        Self {
            success: true,
            translation: Some(translation),
            error: None,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            translation: None,
            error: Some(error),
        }
    }
}

/// 注册的右键菜单项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMenuItem {
    pub id: String,
    pub title: String,
    pub contexts: Vec<String>,
}

impl ContextMenuItem {
    pub fn translate_selection() -> Self {
        Self {
            id: TRANSLATE_SELECTION_MENU_ID.to_string(),
            title: TRANSLATE_SELECTION_MENU_TITLE.to_string(),
            contexts: vec!["selection".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_translate_message_wire_format() {
        let message = RuntimeMessage::Translate {
            text: "Hello".to_string(),
            source_lang: "auto".to_string(),
            target_lang: "zh".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"action": "translate", "text": "Hello", "sourceLang": "auto", "targetLang": "zh"})
        );
    }

    #[test]
    fn test_toggle_optional_fields() {
        let parsed: RuntimeMessage =
            serde_json::from_value(json!({"action": "toggleTranslation", "isEnabled": false})).unwrap();
        assert_eq!(parsed, RuntimeMessage::toggle(false));

        let full: RuntimeMessage = serde_json::from_value(json!({
            "action": "toggleTranslation",
            "isEnabled": true,
            "sourceLanguage": "en",
            "targetLanguage": "ja",
            "translateService": "google"
        }))
        .unwrap();
        assert_eq!(full.action(), "toggleTranslation");
        assert!(matches!(
            full,
            RuntimeMessage::ToggleTranslation { source_language: Some(ref s), .. } if s == "en"
        ));
    }

    #[test]
    fn test_show_translation_wire_format() {
        let message = RuntimeMessage::ShowTranslation {
            original_text: "Hi".to_string(),
            translation: "嗨".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"action": "show-translation", "originalText": "Hi", "translation": "嗨"})
        );
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(
            serde_json::to_value(TranslateResponse::ok("你好".to_string())).unwrap(),
            json!({"success": true, "translation": "你好"})
        );
        assert_eq!(
            serde_json::to_value(TranslateResponse::failure("boom".to_string())).unwrap(),
            json!({"success": false, "error": "boom"})
        );
    }
}
