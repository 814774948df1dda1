//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作
//! - `document`: 可观察的页面文档模型
//! - `serializer`: 序列化功能

pub mod document;
pub mod dom;
pub mod serializer;

pub use document::{MutationRecord, ObserverId, Page, SharedPage};
pub use dom::{
    append_child, create_element, create_text_node, find_nodes, get_child_node_by_name,
    get_element_by_id, get_node_attr, get_node_name, get_parent_node, has_class, html_to_dom,
    set_node_attr, set_text_content, text_content,
};
pub use serializer::{serialize_document, serialize_node};
