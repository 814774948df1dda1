//! 可观察的页面文档模型
//!
//! `Page` 持有解析后的 DOM 与页面地址。所有结构性插入都经由 `Page` 完成，
//! 并以 `MutationRecord` 的形式通知注册在对应子树上的观察者。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use markup5ever_rcdom::{Handle, RcDom};
use tokio::sync::mpsc;
use url::Url;

use super::dom::{self, get_child_node_by_name, get_parent_node, html_to_dom};
use super::serializer::serialize_document;
use crate::translation::error::{TranslationError, TranslationResult};

/// 一次子节点插入
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub target: Handle,
    pub added_nodes: Vec<Handle>,
}

pub type MutationSender = mpsc::UnboundedSender<Vec<MutationRecord>>;
pub type MutationReceiver = mpsc::UnboundedReceiver<Vec<MutationRecord>>;

/// 观察者注册句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

struct Registration {
    id: ObserverId,
    root: Handle,
    sender: MutationSender,
}

/// 页面文档
pub struct Page {
    dom: RcDom,
    url: Option<Url>,
    encoding: String,
    observers: RefCell<Vec<Registration>>,
    next_observer_id: Cell<u64>,
}

impl Page {
    /// 解析 UTF-8 HTML
    pub fn parse(html: &str, url: Option<&str>) -> TranslationResult<Self> {
        Self::from_bytes(html.as_bytes(), "", url)
    }

    /// 按指定编码解析 HTML 字节
    pub fn from_bytes(data: &[u8], encoding: &str, url: Option<&str>) -> TranslationResult<Self> {
        let url = url.map(Url::parse).transpose()?;
        Ok(Self {
            dom: html_to_dom(data, encoding),
            url,
            encoding: encoding.to_string(),
            observers: RefCell::new(Vec::new()),
            next_observer_id: Cell::new(0),
        })
    }

    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// 页面主机名，本地文件等没有主机的地址返回 `None`
    pub fn hostname(&self) -> Option<String> {
        self.url
            .as_ref()
            .and_then(|url| url.host_str())
            .map(|host| host.to_string())
    }

    pub fn body(&self) -> Option<Handle> {
        get_child_node_by_name(&self.dom.document, "html")
            .and_then(|html| get_child_node_by_name(&html, "body"))
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Handle> {
        dom::get_element_by_id(&self.dom.document, id)
    }

    /// 注册 `root` 子树上的插入观察者
    pub fn observe(&self, root: &Handle, sender: MutationSender) -> ObserverId {
        let id = ObserverId(self.next_observer_id.get());
        self.next_observer_id.set(id.0 + 1);
        self.observers.borrow_mut().push(Registration {
            id,
            root: root.clone(),
            sender,
        });
        id
    }

    /// 注销观察者，之后的插入不再通知
    pub fn disconnect(&self, id: ObserverId) {
        self.observers.borrow_mut().retain(|registration| registration.id != id);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// 追加子节点并通知观察者
    pub fn append_child(&self, parent: &Handle, child: &Handle) {
        dom::append_child(parent, child);
        self.notify(MutationRecord {
            target: parent.clone(),
            added_nodes: vec![child.clone()],
        });
    }

    /// 解析 HTML 片段并追加到 `parent` 末尾，返回插入的节点
    pub fn insert_html(&self, parent: &Handle, html: &str) -> Vec<Handle> {
        let fragment = html_to_dom(html.as_bytes(), "");
        let nodes: Vec<Handle> = get_child_node_by_name(&fragment.document, "html")
            .and_then(|html| get_child_node_by_name(&html, "body"))
            .map(|body| body.children.borrow().clone())
            .unwrap_or_default();

        for node in &nodes {
            dom::append_child(parent, node);
        }

        if !nodes.is_empty() {
            self.notify(MutationRecord {
                target: parent.clone(),
                added_nodes: nodes.clone(),
            });
        }
        nodes
    }

    /// 从文档中移除节点
    pub fn remove_child(&self, node: &Handle) {
        dom::detach(node);
    }

    /// 序列化为页面原始编码的字节
    pub fn serialize(&self) -> TranslationResult<Vec<u8>> {
        serialize_document(&self.dom.document, &self.encoding)
            .map_err(|e| TranslationError::IoError(format!("序列化文档失败: {}", e)))
    }

    fn notify(&self, record: MutationRecord) {
        self.observers.borrow_mut().retain(|registration| {
            if !is_inclusive_ancestor(&registration.root, &record.target) {
                return true;
            }
            // 接收端已关闭时顺带注销
            registration.sender.send(vec![record.clone()]).is_ok()
        });
    }
}

fn is_inclusive_ancestor(ancestor: &Handle, node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if Rc::ptr_eq(&candidate, ancestor) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

/// 共享的页面句柄
pub type SharedPage = Rc<Page>;
