//! DOM 遍历与译文写回
//!
//! 遍历规则：
//!
//! - 非内容元素（script/style）和带不翻译标记的子树整体跳过
//! - 直接传入的非空文本节点就地翻译，不进缓存也不留标记
//! - 元素的非空文本子节点按 (源语言, 目标语言, 原文) 查缓存：命中时同步写回，
//!   未命中时异步请求后台，结果先写缓存再写回文本
//! - 子元素递归处理
//!
//! 已标记为译文的元素不会再次进入遍历。遍历只就地改写文本节点、从不插入
//! 节点，因此不会触发插入观察者；这一标记检查是防止观察者与遍历互相触发的
//! 保护措施。
//!
//! 异步任务通过 `spawn_local` 派发，调用方需要运行在 `LocalSet` 中。

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData};
use tokio::task::JoinSet;

use super::filters::{has_translatable_text, should_skip};
use super::markers::MarkerStore;
use crate::messaging::port::BackgroundPort;
use crate::parsers::html::dom::{get_parent_node, is_element, node_text, set_node_text};
use crate::translation::storage::cache::{CacheKey, TranslationCache};

/// 源语言与目标语言
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    fn cache_key(&self, text: &str) -> CacheKey {
        CacheKey::new(&self.source, &self.target, text)
    }
}

/// 一次翻译会话内遍历共享的状态
pub struct WalkerContext {
    languages: LanguagePair,
    cache: Rc<TranslationCache>,
    markers: RefCell<MarkerStore>,
    port: BackgroundPort,
    tasks: RefCell<JoinSet<()>>,
    active: Cell<bool>,
}

impl WalkerContext {
    pub fn new(languages: LanguagePair, cache: Rc<TranslationCache>, port: BackgroundPort) -> Self {
        Self {
            languages,
            cache,
            markers: RefCell::new(MarkerStore::new()),
            port,
            tasks: RefCell::new(JoinSet::new()),
            active: Cell::new(true),
        }
    }

    pub fn languages(&self) -> &LanguagePair {
        &self.languages
    }

    pub fn cache(&self) -> &Rc<TranslationCache> {
        &self.cache
    }

    pub fn markers(&self) -> &RefCell<MarkerStore> {
        &self.markers
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// 停止接收新的遍历；已派发的任务完成后只更新缓存
    pub fn deactivate(&self) {
        self.active.set(false);
    }

    /// 取出当前待完成的任务集合
    pub fn take_tasks(&self) -> JoinSet<()> {
        std::mem::take(&mut *self.tasks.borrow_mut())
    }

    /// 在途任务数，已完成的任务先被回收
    pub fn pending_tasks(&self) -> usize {
        let mut tasks = self.tasks.borrow_mut();
        reap_finished(&mut tasks);
        tasks.len()
    }

    /// 派发一个翻译任务，顺带回收已完成的任务
    fn dispatch<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let mut tasks = self.tasks.borrow_mut();
        reap_finished(&mut tasks);
        tasks.spawn_local(task);
    }

    /// 放弃对在途任务的跟踪，任务本身继续运行
    pub fn detach_tasks(&self) {
        self.tasks.borrow_mut().detach_all();
    }
}

/// DOM 遍历器
#[derive(Clone)]
pub struct DomWalker {
    ctx: Rc<WalkerContext>,
}

impl DomWalker {
    pub fn new(ctx: Rc<WalkerContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Rc<WalkerContext> {
        &self.ctx
    }

    /// 遍历并翻译以 `node` 为根的子树
    pub fn walk(&self, node: &Handle) {
        if !self.ctx.is_active() || self.ctx.markers.borrow().is_translated(node) {
            return;
        }

        match &node.data {
            NodeData::Text { .. } => self.walk_text_leaf(node),
            NodeData::Element { .. } => {
                if should_skip(node) {
                    return;
                }
                self.walk_children(node);
            }
            NodeData::Document => self.walk_children(node),
            _ => {}
        }
    }

    fn walk_text_leaf(&self, node: &Handle) {
        let Some(text) = node_text(node) else {
            return;
        };
        if !has_translatable_text(&text) {
            return;
        }
        if get_parent_node(node).map_or(false, |parent| should_skip(&parent)) {
            return;
        }

        let ctx = Rc::clone(&self.ctx);
        let node = node.clone();
        self.ctx.dispatch(async move {
            let translation = request_translation(&ctx, &text).await;
            if ctx.is_active() {
                set_node_text(&node, &translation.unwrap_or(text));
            }
        });
    }

    fn walk_children(&self, element: &Handle) {
        let children: Vec<Handle> = element.children.borrow().clone();

        // 在任何后代被改写之前记录全文
        let has_text_child = children
            .iter()
            .any(|child| node_text(child).map_or(false, |text| has_translatable_text(&text)));
        if has_text_child && is_element(element) {
            self.ctx.markers.borrow_mut().snapshot(element);
        }

        for child in children {
            match &child.data {
                NodeData::Text { .. } => {
                    let Some(original) = node_text(&child) else {
                        continue;
                    };
                    if !has_translatable_text(&original) {
                        continue;
                    }
                    self.translate_child_text(element, child, original);
                }
                NodeData::Element { .. } => self.walk(&child),
                _ => {}
            }
        }
    }

    fn translate_child_text(&self, element: &Handle, child: Handle, original: String) {
        let key = self.ctx.languages.cache_key(&original);

        if let Some(cached) = self.ctx.cache.get(&key) {
            set_node_text(&child, &cached);
            self.ctx.markers.borrow_mut().mark_translated(element);
            return;
        }

        let ctx = Rc::clone(&self.ctx);
        let element = element.clone();
        self.ctx.dispatch(async move {
            let translation = match request_translation(&ctx, &original).await {
                Some(translation) => {
                    ctx.cache.set(key, translation.clone());
                    translation
                }
                // 失败时写回原文，不进缓存
                None => original,
            };

            if !ctx.is_active() {
                return;
            }
            set_node_text(&child, &translation);
            ctx.markers.borrow_mut().mark_translated(&element);
        });
    }
}

fn reap_finished(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(e) = result {
            tracing::warn!("翻译任务异常结束: {}", e);
        }
    }
}

/// 通过后台端口翻译，失败时记录诊断并返回 `None`
async fn request_translation(ctx: &WalkerContext, text: &str) -> Option<String> {
    match ctx
        .port
        .translate(text, &ctx.languages.source, &ctx.languages.target)
        .await
    {
        Ok(translation) => Some(translation),
        Err(error) => {
            tracing::warn!("翻译失败: {}", error);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::port::background_channel;
    use crate::messaging::protocol::{RuntimeMessage, TranslateResponse};
    use crate::parsers::html::dom::{get_element_by_id, html_to_dom, text_content};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::task::LocalSet;

    /// 以 `[text]` 作为译文的后台，并统计请求次数
    fn bracket_port(calls: Arc<AtomicUsize>) -> BackgroundPort {
        let (port, mut inbox) = background_channel();
        tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                if let (RuntimeMessage::Translate { text, .. }, Some(reply)) = (envelope.message, envelope.reply) {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let _ = reply.send(TranslateResponse::ok(format!("[{}]", text)));
                }
            }
        });
        port
    }

    async fn settle(ctx: &WalkerContext) {
        loop {
            let mut tasks = ctx.take_tasks();
            if tasks.is_empty() {
                break;
            }
            while tasks.join_next().await.is_some() {}
        }
    }

    #[tokio::test]
    async fn test_walk_translates_and_caches() {
        LocalSet::new()
            .run_until(async {
                let calls = Arc::new(AtomicUsize::new(0));
                let cache = Rc::new(TranslationCache::new());
                let ctx = Rc::new(WalkerContext::new(
                    LanguagePair::new("auto", "zh"),
                    cache.clone(),
                    bracket_port(calls.clone()),
                ));
                let walker = DomWalker::new(ctx.clone());

                let dom = html_to_dom(b"<p id=\"p\">Hello <b id=\"b\">big</b> world</p>", "");
                walker.walk(&dom.document);
                settle(&ctx).await;

                let p = get_element_by_id(&dom.document, "p").unwrap();
                let b = get_element_by_id(&dom.document, "b").unwrap();
                assert_eq!(text_content(&p), "[Hello ][big][ world]");
                assert_eq!(calls.load(Ordering::SeqCst), 3);
                assert_eq!(cache.len(), 3);

                let markers = ctx.markers().borrow();
                assert!(markers.is_translated(&p));
                assert!(markers.is_translated(&b));
                assert_eq!(markers.original_text(&p), Some("Hello big world"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_cache_hit_applies_without_request() {
        LocalSet::new()
            .run_until(async {
                let calls = Arc::new(AtomicUsize::new(0));
                let cache = Rc::new(TranslationCache::new());
                cache.set(CacheKey::new("auto", "zh", "Hello"), "你好".to_string());
                let ctx = Rc::new(WalkerContext::new(
                    LanguagePair::new("auto", "zh"),
                    cache,
                    bracket_port(calls.clone()),
                ));

                let dom = html_to_dom(b"<p id=\"p\">Hello</p>", "");
                DomWalker::new(ctx.clone()).walk(&dom.document);

                // 命中缓存时同步写回
                let p = get_element_by_id(&dom.document, "p").unwrap();
                assert_eq!(text_content(&p), "你好");
                assert_eq!(ctx.pending_tasks(), 0);
                assert_eq!(calls.load(Ordering::SeqCst), 0);
                assert_eq!(ctx.markers().borrow().original_text(&p), Some("Hello"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_original() {
        LocalSet::new()
            .run_until(async {
                let (port, mut inbox) = background_channel();
                tokio::spawn(async move {
                    while let Some(envelope) = inbox.recv().await {
                        if let Some(reply) = envelope.reply {
                            let _ = reply.send(TranslateResponse::failure("boom".to_string()));
                        }
                    }
                });

                let cache = Rc::new(TranslationCache::new());
                let ctx = Rc::new(WalkerContext::new(LanguagePair::new("auto", "zh"), cache.clone(), port));
                let dom = html_to_dom(b"<p id=\"p\">Hello</p>", "");
                DomWalker::new(ctx.clone()).walk(&dom.document);
                settle(&ctx).await;

                let p = get_element_by_id(&dom.document, "p").unwrap();
                assert_eq!(text_content(&p), "Hello");
                assert!(ctx.markers().borrow().is_translated(&p));
                assert!(cache.is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_protected_subtrees_are_not_requested() {
        LocalSet::new()
            .run_until(async {
                let calls = Arc::new(AtomicUsize::new(0));
                let ctx = Rc::new(WalkerContext::new(
                    LanguagePair::new("auto", "zh"),
                    Rc::new(TranslationCache::new()),
                    bracket_port(calls.clone()),
                ));

                let dom = html_to_dom(
                    b"<div class=\"notranslate\"><p>Keep</p></div><script>var a = 1;</script><p translate=\"no\">Also</p>",
                    "",
                );
                DomWalker::new(ctx.clone()).walk(&dom.document);
                settle(&ctx).await;

                assert_eq!(calls.load(Ordering::SeqCst), 0);
                assert!(ctx.markers().borrow().is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_text_leaf_is_translated_in_place() {
        LocalSet::new()
            .run_until(async {
                let calls = Arc::new(AtomicUsize::new(0));
                let ctx = Rc::new(WalkerContext::new(
                    LanguagePair::new("auto", "zh"),
                    Rc::new(TranslationCache::new()),
                    bracket_port(calls.clone()),
                ));

                let dom = html_to_dom(b"<p id=\"p\">Hello</p>", "");
                let p = get_element_by_id(&dom.document, "p").unwrap();
                let text = p.children.borrow()[0].clone();

                DomWalker::new(ctx.clone()).walk(&text);
                settle(&ctx).await;

                assert_eq!(text_content(&p), "[Hello]");
                assert!(ctx.markers().borrow().is_empty());
                assert!(ctx.cache().is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_inactive_context_does_nothing() {
        LocalSet::new()
            .run_until(async {
                let calls = Arc::new(AtomicUsize::new(0));
                let ctx = Rc::new(WalkerContext::new(
                    LanguagePair::new("auto", "zh"),
                    Rc::new(TranslationCache::new()),
                    bracket_port(calls.clone()),
                ));
                ctx.deactivate();

                let dom = html_to_dom(b"<p>Hello</p>", "");
                DomWalker::new(ctx.clone()).walk(&dom.document);
                assert_eq!(ctx.pending_tasks(), 0);
            })
            .await;
    }
}
