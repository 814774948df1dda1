//! 翻译会话
//!
//! 一次页面翻译运行期间的全部活动状态：语言对、共享缓存、元素标记、在途任务
//! 和插入观察者。会话在开始翻译时创建，在停止翻译时被消耗：观察者断开、
//! 标记恢复、在途任务不再被跟踪。

use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::messaging::port::BackgroundPort;
use crate::parsers::html::document::Page;
use crate::translation::pipeline::observer::ChangeObserver;
use crate::translation::pipeline::walker::{DomWalker, LanguagePair, WalkerContext};
use crate::translation::storage::cache::TranslationCache;

/// 页面翻译会话
pub struct TranslationSession {
    ctx: Rc<WalkerContext>,
    observer: Option<ChangeObserver>,
}

impl TranslationSession {
    /// 翻译整个页面正文并开始监听插入
    ///
    /// 必须在 `LocalSet` 中调用。
    pub fn start(
        page: &Rc<Page>,
        languages: LanguagePair,
        cache: Rc<TranslationCache>,
        port: BackgroundPort,
    ) -> Self {
        tracing::info!("开始翻译: {} -> {}", languages.source, languages.target);

        let ctx = Rc::new(WalkerContext::new(languages, cache, port));
        let walker = DomWalker::new(Rc::clone(&ctx));

        let observer = match page.body() {
            Some(body) => {
                walker.walk(&body);
                Some(ChangeObserver::attach(page, &body, walker))
            }
            None => {
                tracing::warn!("页面没有 body 元素，跳过翻译");
                None
            }
        };

        Self { ctx, observer }
    }

    pub fn languages(&self) -> &LanguagePair {
        self.ctx.languages()
    }

    pub fn is_observing(&self) -> bool {
        self.observer.is_some()
    }

    /// 已显示译文的元素数量
    pub fn translated_count(&self) -> usize {
        self.ctx.markers().borrow().translated_count()
    }

    /// 已记录快照的元素数量
    pub fn marker_count(&self) -> usize {
        self.ctx.markers().borrow().len()
    }

    pub fn is_translated(&self, element: &Handle) -> bool {
        self.ctx.markers().borrow().is_translated(element)
    }

    pub fn original_text(&self, element: &Handle) -> Option<String> {
        self.ctx
            .markers()
            .borrow()
            .original_text(element)
            .map(|text| text.to_string())
    }

    pub fn pending_tasks(&self) -> usize {
        self.ctx.pending_tasks()
    }

    /// 等待所有在途翻译完成，包括观察者因新插入派发的翻译
    pub async fn settle(&self) {
        loop {
            // 让观察者先处理已排队的插入
            tokio::task::yield_now().await;

            let mut tasks = self.ctx.take_tasks();
            if tasks.is_empty() {
                break;
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    tracing::warn!("翻译任务异常结束: {}", e);
                }
            }
        }
    }

    /// 停止翻译并恢复原文，返回恢复的元素数量
    pub fn stop(mut self) -> usize {
        self.ctx.deactivate();
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        let reverted = self.ctx.markers().borrow_mut().revert_all();
        self.ctx.detach_tasks();
        tracing::info!("已停止翻译，恢复 {} 个元素", reverted);
        reverted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::port::background_channel;
    use crate::messaging::protocol::{RuntimeMessage, TranslateResponse};
    use crate::parsers::html::dom::text_content;
    use tokio::task::LocalSet;

    fn upper_port() -> BackgroundPort {
        let (port, mut inbox) = background_channel();
        tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                if let (RuntimeMessage::Translate { text, .. }, Some(reply)) = (envelope.message, envelope.reply) {
                    let _ = reply.send(TranslateResponse::ok(text.to_uppercase()));
                }
            }
        });
        port
    }

    #[tokio::test]
    async fn test_start_settle_stop() {
        LocalSet::new()
            .run_until(async {
                let page = Rc::new(Page::parse("<h1>Title</h1><p>Some <i>text</i></p>", None).unwrap());
                let body = page.body().unwrap();
                let before = text_content(&body);

                let session = TranslationSession::start(
                    &page,
                    LanguagePair::new("auto", "zh"),
                    Rc::new(TranslationCache::new()),
                    upper_port(),
                );
                assert!(session.is_observing());
                session.settle().await;

                assert_eq!(text_content(&body), "TITLESOME TEXT");
                assert_eq!(session.translated_count(), 3);

                assert_eq!(session.stop(), 3);
                assert_eq!(text_content(&body), before);
                assert_eq!(page.observer_count(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_finished_tasks_are_reaped_without_settle() {
        LocalSet::new()
            .run_until(async {
                let html = "<p>row</p>".repeat(50);
                let page = Rc::new(Page::parse(&html, None).unwrap());

                let session = TranslationSession::start(
                    &page,
                    LanguagePair::new("auto", "zh"),
                    Rc::new(TranslationCache::new()),
                    upper_port(),
                );
                assert_eq!(session.pending_tasks(), 50);

                for _ in 0..200 {
                    if session.translated_count() == 50 {
                        break;
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                }
                assert_eq!(session.translated_count(), 50);
                assert_eq!(session.pending_tasks(), 0);

                // 观察者派发的新任务同样在完成后被回收
                page.insert_html(&page.body().unwrap(), "<p>more</p>");
                for _ in 0..200 {
                    if session.translated_count() == 51 {
                        break;
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                }
                assert_eq!(session.translated_count(), 51);
                assert_eq!(session.pending_tasks(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_stop_with_requests_in_flight() {
        LocalSet::new()
            .run_until(async {
                let page = Rc::new(Page::parse("<p>Hello</p>", None).unwrap());
                let body = page.body().unwrap();

                let session = TranslationSession::start(
                    &page,
                    LanguagePair::new("auto", "zh"),
                    Rc::new(TranslationCache::new()),
                    upper_port(),
                );
                assert_eq!(session.pending_tasks(), 1);
                assert_eq!(session.stop(), 1);

                // 迟到的译文不会再写回页面
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                assert_eq!(text_content(&body), "Hello");
            })
            .await;
    }
}
