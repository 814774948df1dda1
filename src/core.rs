//! 页面翻译流水线
//!
//! 读取本地文件或远程页面，在进程内组装后台宿主与页面代理，翻译正文并输出
//! 按原编码序列化的文档。

use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use tokio::task::LocalSet;
use url::Url;

use crate::messaging::background::BackgroundHost;
use crate::messaging::content::ContentAgent;
use crate::messaging::port::{background_channel, page_channel, PageEvent};
use crate::messaging::protocol::{RuntimeMessage, TRANSLATE_SELECTION_MENU_ID};
use crate::parsers::html::document::Page;
use crate::parsers::html::dom::{find_nodes, get_node_attr, html_to_dom};
use crate::translation::config::TranslationConfig;
use crate::translation::core::client::{GoogleTranslateClient, Translator};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::walker::LanguagePair;
use crate::translation::storage::cache::CacheStats;
use crate::translation::storage::settings::SettingsStore;

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";
// All known non-"text/..." plaintext media types
const PLAINTEXT_MEDIA_TYPES: &[&str] = &[
    "application/xhtml+xml",
    "application/xml",
    "image/svg+xml",
];

/// 页面翻译选项
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// 本地路径或 http(s) 地址
    pub target: String,
    /// 覆盖设置中的源语言
    pub source_lang: Option<String>,
    /// 覆盖设置中的目标语言
    pub target_lang: Option<String>,
    /// 忽略启用开关与站点排除
    pub force: bool,
    /// 强制指定输入编码
    pub encoding: Option<String>,
}

/// 读取到的原始文档
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub data: Vec<u8>,
    pub charset: String,
    pub url: Option<Url>,
}

/// 一次页面翻译的结果
#[derive(Debug, Clone)]
pub struct PageReport {
    pub output: Vec<u8>,
    pub started: bool,
    pub translated_elements: usize,
    pub cache_stats: CacheStats,
}

/// 读取本地文件或远程页面
pub async fn load_document(http: &reqwest::Client, target: &str) -> TranslationResult<LoadedDocument> {
    if target.starts_with("http://") || target.starts_with("https://") {
        let url = Url::parse(target)?;
        let response = http.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::HttpStatus(status.as_u16()));
        }

        let (media_type, charset) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(parse_content_type)
            .unwrap_or_else(|| ("text/html".to_string(), String::new()));

        if !is_plaintext_media_type(&media_type) {
            return Err(TranslationError::InvalidInput(format!(
                "Unsupported media type: {}",
                media_type
            )));
        }

        let final_url = response.url().clone();
        let data = response.bytes().await?.to_vec();
        return Ok(LoadedDocument {
            data,
            charset,
            url: Some(final_url),
        });
    }

    let path = Path::new(target);
    if !path.exists() {
        return Err(TranslationError::InvalidInput(format!("File not found: {}", target)));
    }

    let data = fs::read(path)?;
    // 本地文件没有主机名，不受站点排除影响
    let url = fs::canonicalize(path)
        .ok()
        .and_then(|canonical| Url::from_file_path(canonical).ok());

    Ok(LoadedDocument {
        data,
        charset: String::new(),
        url,
    })
}

/// 文档声明的字符集
pub fn get_charset(data: &[u8]) -> Option<String> {
    let dom = html_to_dom(data, "utf-8");
    for meta_node in find_nodes(&dom.document, &["html", "head", "meta"]) {
        if let Some(charset) = get_node_attr(&meta_node, "charset") {
            return Some(charset);
        }

        if get_node_attr(&meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            if let Some(content) = get_node_attr(&meta_node, "content") {
                let (_media_type, charset) = parse_content_type(&content);
                if !charset.is_empty() {
                    return Some(charset);
                }
            }
        }
    }
    None
}

/// 在独立的 `LocalSet` 中翻译一份文档
///
/// 后台宿主作为普通任务运行，页面代理及其会话运行在 `LocalSet` 内。
pub async fn translate_document(
    document: LoadedDocument,
    settings: Arc<dyn SettingsStore>,
    translator: Arc<dyn Translator>,
    options: &TranslateOptions,
) -> TranslationResult<PageReport> {
    let current = settings.load()?;
    let languages = LanguagePair::new(
        options.source_lang.as_deref().unwrap_or(&current.source_language),
        options.target_lang.as_deref().unwrap_or(&current.target_language),
    );

    let charset = match &options.encoding {
        Some(encoding) => encoding.clone(),
        None if document.charset.is_empty() => get_charset(&document.data).unwrap_or_default(),
        None => document.charset.clone(),
    };

    let (port, inbox) = background_channel();
    let host = Arc::new(BackgroundHost::new(translator, Arc::clone(&settings)));
    let server = tokio::spawn(host.serve(inbox));

    let local = LocalSet::new();
    let report = local
        .run_until(async move {
            let url = document.url.as_ref().map(|url| url.to_string());
            let page = Rc::new(Page::from_bytes(&document.data, &charset, url.as_deref())?);
            let mut agent = ContentAgent::new(Rc::clone(&page), port, settings);

            let excluded = page
                .hostname()
                .map_or(false, |host| current.is_site_excluded(&host));
            let started = if options.force || (current.is_enabled && !excluded) {
                agent.start_translation(languages)
            } else {
                if excluded {
                    tracing::info!("站点已被排除，输出原文");
                } else {
                    tracing::info!("翻译未启用，输出原文");
                }
                false
            };

            agent.settle().await;
            let translated_elements = agent.session().map_or(0, |session| session.translated_count());
            let cache_stats = agent.cache().get_stats();

            Ok::<_, TranslationError>(PageReport {
                output: page.serialize()?,
                started,
                translated_elements,
                cache_stats,
            })
        })
        .await;

    server.abort();
    report
}

/// 读取并翻译 `options.target` 指向的页面
pub async fn translate_page(
    config: &TranslationConfig,
    settings: Arc<dyn SettingsStore>,
    options: &TranslateOptions,
) -> TranslationResult<PageReport> {
    let translator = Arc::new(GoogleTranslateClient::new(config.clone())?);

    let mut builder = reqwest::Client::builder();
    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }
    let http = builder
        .build()
        .map_err(|e| TranslationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;

    let document = load_document(&http, &options.target).await?;
    translate_document(document, settings, translator, options).await
}

/// 经由后台的右键菜单流程翻译一段选中文本，返回 (原文, 译文)
///
/// 翻译失败时只记录日志并返回 `None`。
pub async fn translate_selection(
    settings: Arc<dyn SettingsStore>,
    translator: Arc<dyn Translator>,
    selection: &str,
) -> Option<(String, String)> {
    let host = BackgroundHost::new(translator, settings);
    let (tab, mut events) = page_channel();

    host.on_context_menu_clicked(TRANSLATE_SELECTION_MENU_ID, selection, &tab)
        .await;
    drop(tab);

    while let Some(event) = events.recv().await {
        if let PageEvent::Message(RuntimeMessage::ShowTranslation {
            original_text,
            translation,
        }) = event
        {
            return Some((original_text, translation));
        }
    }
    None
}

/// Parses Content-Type header value into (media type, charset)
pub fn parse_content_type(content_type: &str) -> (String, String) {
    let mut media_type = String::new();
    let mut charset = String::new();

    let parts: Vec<&str> = content_type.split(';').collect();

    if !parts.is_empty() {
        media_type = parts[0].trim().to_lowercase();
    }

    for part in parts.iter().skip(1) {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("charset=") {
            charset = value.trim_matches('"').to_string();
        }
    }

    (media_type, charset)
}

/// Checks if the given media type represents plaintext content
pub fn is_plaintext_media_type(media_type: &str) -> bool {
    media_type.starts_with("text/") || PLAINTEXT_MEDIA_TYPES.contains(&media_type)
}

/// Prints an error message to stderr
pub fn print_error_message(msg: &str, color: bool) {
    if color {
        eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
    } else {
        eprintln!("{msg}");
    }
}

/// Prints an info message to stdout
pub fn print_info_message(msg: &str) {
    println!("{msg}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_type() {
        let (media_type, charset) = parse_content_type("text/html; charset=\"ISO-8859-1\"");
        assert_eq!(media_type, "text/html");
        assert_eq!(charset, "ISO-8859-1");

        let (media_type, charset) = parse_content_type("TEXT/HTML");
        assert_eq!(media_type, "text/html");
        assert!(charset.is_empty());

        // 其余参数被忽略
        let (media_type, charset) = parse_content_type("text/plain;base64;charset=utf-8");
        assert_eq!(media_type, "text/plain");
        assert_eq!(charset, "utf-8");
    }

    #[test]
    fn test_plaintext_media_types() {
        assert!(is_plaintext_media_type("text/html"));
        assert!(is_plaintext_media_type("application/xhtml+xml"));
        assert!(!is_plaintext_media_type("image/png"));
    }

    #[test]
    fn test_get_charset() {
        assert_eq!(
            get_charset(b"<html><head><meta charset=\"windows-1252\"></head></html>").as_deref(),
            Some("windows-1252")
        );
        assert_eq!(
            get_charset(b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=euc-kr\">").as_deref(),
            Some("euc-kr")
        );
        assert_eq!(get_charset(b"<p>none</p>"), None);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let http = reqwest::Client::new();
        let err = load_document(&http, "/definitely/not/here.html").await.unwrap_err();
        assert!(matches!(err, TranslationError::InvalidInput(_)));
    }
}
