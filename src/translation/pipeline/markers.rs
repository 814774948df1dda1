//! 译文标记
//!
//! 记录每个被改写元素的翻译前全文，用于停止翻译时恢复。
//! 元素按节点身份（`Rc` 指针）区分，同一元素只保留第一次快照。

use std::collections::HashMap;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::{set_text_content, text_content};

fn node_key(node: &Handle) -> usize {
    Rc::as_ptr(node) as usize
}

#[derive(Debug)]
struct Marker {
    element: Handle,
    original_text: Option<String>,
    translated: bool,
}

/// 元素标记存储
#[derive(Debug, Default)]
pub struct MarkerStore {
    markers: Vec<Marker>,
    index: HashMap<usize, usize>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, element: &Handle) -> &mut Marker {
        let key = node_key(element);
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.markers.push(Marker {
                    element: element.clone(),
                    original_text: None,
                    translated: false,
                });
                let position = self.markers.len() - 1;
                self.index.insert(key, position);
                position
            }
        };
        &mut self.markers[position]
    }

    fn get(&self, element: &Handle) -> Option<&Marker> {
        self.index
            .get(&node_key(element))
            .map(|&position| &self.markers[position])
    }

    /// 在第一次改写前记录元素全文，已有快照时不覆盖
    pub fn snapshot(&mut self, element: &Handle) {
        let marker = self.entry(element);
        if marker.original_text.is_none() {
            marker.original_text = Some(text_content(element));
        }
    }

    /// 标记元素已显示译文
    pub fn mark_translated(&mut self, element: &Handle) {
        self.entry(element).translated = true;
    }

    pub fn is_translated(&self, element: &Handle) -> bool {
        self.get(element).map_or(false, |marker| marker.translated)
    }

    pub fn original_text(&self, element: &Handle) -> Option<&str> {
        self.get(element).and_then(|marker| marker.original_text.as_deref())
    }

    /// 已记录快照的元素数量
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn translated_count(&self) -> usize {
        self.markers.iter().filter(|marker| marker.translated).count()
    }

    /// 恢复全部快照并清空标记，返回恢复的元素数量
    ///
    /// 尚未收到译文的元素同样恢复，其中待写入的文本节点随之脱离文档。
    pub fn revert_all(&mut self) -> usize {
        let mut reverted = 0;
        for marker in self.markers.drain(..) {
            if let Some(original) = marker.original_text {
                set_text_content(&marker.element, &original);
                reverted += 1;
            }
        }
        self.index.clear();
        reverted
    }
}
