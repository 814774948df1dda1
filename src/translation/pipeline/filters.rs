//! 节点过滤规则
//!
//! 决定一个节点是否进入翻译：脚本和样式元素、带不翻译标记的元素
//! 及其全部后代都会被跳过。

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::{get_node_attr, get_node_name, get_parent_node, has_class};
use crate::translation::config::constants;

/// 文本是否含有可翻译内容（非空白）
pub fn has_translatable_text(text: &str) -> bool {
    !text.trim().is_empty()
}

/// 元素是否属于非内容元素
pub fn is_skipped_element(node: &Handle) -> bool {
    get_node_name(node).map_or(false, |name| {
        constants::SKIP_ELEMENTS
            .iter()
            .any(|skipped| name.eq_ignore_ascii_case(skipped))
    })
}

/// 元素自身是否带有不翻译标记
///
/// 支持 `class="notranslate"` 和 `translate="no"` 两种写法。
pub fn has_no_translate_marker(node: &Handle) -> bool {
    has_class(node, constants::NO_TRANSLATE_CLASS)
        || get_node_attr(node, "translate").map_or(false, |value| value.trim().eq_ignore_ascii_case("no"))
}

/// 节点自身或任一祖先带有不翻译标记
pub fn is_inside_no_translate(node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if has_no_translate_marker(&candidate) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

/// 元素是否应整体跳过（不递归）
pub fn should_skip(node: &Handle) -> bool {
    is_skipped_element(node) || is_inside_no_translate(node)
}
