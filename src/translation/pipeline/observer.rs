//! 插入观察者
//!
//! 监听页面子树的节点插入，把新插入的元素交给遍历器。只在翻译启用期间存在，
//! 断开时注销监听并结束处理任务。

use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::walker::DomWalker;
use crate::parsers::html::document::{ObserverId, Page};
use crate::parsers::html::dom::is_element;

/// 已挂载的观察者
pub struct ChangeObserver {
    page: Rc<Page>,
    id: ObserverId,
    task: JoinHandle<()>,
}

impl ChangeObserver {
    /// 在 `root` 子树上挂载观察者，需要运行在 `LocalSet` 中
    pub fn attach(page: &Rc<Page>, root: &Handle, walker: DomWalker) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = page.observe(root, tx);

        let task = tokio::task::spawn_local(async move {
            while let Some(records) = rx.recv().await {
                for record in records {
                    for node in record.added_nodes.iter().filter(|node| is_element(node)) {
                        walker.walk(node);
                    }
                }
            }
        });

        tracing::debug!("插入观察者已挂载");
        Self {
            page: Rc::clone(page),
            id,
            task,
        }
    }

    pub fn disconnect(self) {
        // 注销与结束任务在 Drop 中完成
    }
}

impl Drop for ChangeObserver {
    fn drop(&mut self) {
        self.page.disconnect(self.id);
        self.task.abort();
        tracing::debug!("插入观察者已断开");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::port::background_channel;
    use crate::parsers::html::dom::{create_text_node, text_content};
    use crate::translation::pipeline::walker::{LanguagePair, WalkerContext};
    use crate::translation::storage::cache::TranslationCache;
    use tokio::task::LocalSet;

    #[tokio::test]
    async fn test_inserted_elements_are_walked() {
        LocalSet::new()
            .run_until(async {
                // 后台直接丢弃请求：任务会以原文回退结束
                let (port, inbox) = background_channel();
                drop(inbox);

                let page = Rc::new(Page::parse("<div id=\"root\"></div>", None).unwrap());
                let ctx = Rc::new(WalkerContext::new(
                    LanguagePair::new("auto", "zh"),
                    Rc::new(TranslationCache::new()),
                    port,
                ));
                let body = page.body().unwrap();
                let observer = ChangeObserver::attach(&page, &body, DomWalker::new(ctx.clone()));

                let root = page.get_element_by_id("root").unwrap();
                page.insert_html(&root, "<p>Hello</p>");
                // 文本节点插入不会触发遍历
                page.append_child(&root, &create_text_node("loose"));
                tokio::task::yield_now().await;

                assert_eq!(ctx.pending_tasks(), 1);
                assert_eq!(ctx.markers().borrow().len(), 1);

                observer.disconnect();
                assert_eq!(page.observer_count(), 0);
                assert_eq!(text_content(&root), "Helloloose");
            })
            .await;
    }
}
