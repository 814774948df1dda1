// 集成测试公共模块
//
// 提供模拟翻译器、后台宿主和测试页面

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::task::JoinHandle;

use page_translate::messaging::background::BackgroundHost;
use page_translate::messaging::port::{background_channel, BackgroundPort};
use page_translate::parsers::html::document::Page;
use page_translate::translation::config::TranslationConfig;
use page_translate::translation::storage::{MemorySettingsStore, SettingsStore, TranslationSettings};
use page_translate::translation::{TranslationError, TranslationResult, Translator};

/// 以 `[text]` 作为译文的模拟翻译器，记录每一次调用
#[derive(Default)]
pub struct MockTranslator {
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
    failing: Vec<String>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 对包含 `needle` 的文本返回服务不可用
    pub fn failing_on(needle: &str) -> Self {
        Self {
            failing: vec![needle.to_string()],
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, _source_lang: &str, _target_lang: &str) -> TranslationResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());

        if self.failing.iter().any(|needle| text.contains(needle.as_str())) {
            return Err(TranslationError::ServiceUnavailable);
        }
        Ok(format!("[{}]", text))
    }
}

/// 运行中的后台宿主
pub struct TestBackground {
    pub translator: Arc<MockTranslator>,
    pub settings: Arc<dyn SettingsStore>,
    pub port: BackgroundPort,
    task: JoinHandle<()>,
}

impl TestBackground {
    pub fn start(translator: MockTranslator) -> Self {
        Self::with_settings(translator, TranslationSettings::default())
    }

    pub fn with_settings(translator: MockTranslator, settings: TranslationSettings) -> Self {
        let translator = Arc::new(translator);
        let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new(settings));
        let host = Arc::new(BackgroundHost::new(
            Arc::clone(&translator) as Arc<dyn Translator>,
            Arc::clone(&settings),
        ));

        let (port, inbox) = background_channel();
        let task = tokio::spawn(host.serve(inbox));

        Self {
            translator,
            settings,
            port,
            task,
        }
    }
}

impl Drop for TestBackground {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// 测试页面
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn page(html: &str) -> Rc<Page> {
        Rc::new(Page::parse(html, None).unwrap())
    }

    pub fn page_at(html: &str, url: &str) -> Rc<Page> {
        Rc::new(Page::parse(html, Some(url)).unwrap())
    }

    pub fn article() -> &'static str {
        r#"<!DOCTYPE html>
<html>
<head><title>News</title><style>p { color: red; }</style></head>
<body>
    <h1 id="title">Hello world</h1>
    <p id="lead">Rust is <b id="bold">fast</b> and safe.</p>
    <pre class="notranslate" id="code">let x = 1;</pre>
    <script>var greeting = "hello";</script>
</body>
</html>"#
    }
}

/// 指向模拟端点、重试延迟很短的客户端配置
pub fn fast_config(server_uri: &str) -> TranslationConfig {
    TranslationConfig {
        api_url: format!("{}/translate_a/single", server_uri),
        retry_delay_ms: 10,
        ..TranslationConfig::default()
    }
}
