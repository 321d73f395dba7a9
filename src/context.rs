use crate::io_struct::ContextItem;

pub const CONTEXT_HEADER: &str = "### Retrieved Context";
pub const CONTEXT_SEPARATOR: &str = "---";
pub const MAX_ITEM_CHARS: usize = 1200;

/// Render retrieved snippets as a single system-prompt block.
///
/// Returns an empty string for no items; callers must then skip the
/// context message instead of injecting an empty one.
pub fn build_context_block(items: &[ContextItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut block = String::from(CONTEXT_HEADER);
    block.push('\n');
    for (i, item) in items.iter().enumerate() {
        let text: String = item.text.chars().take(MAX_ITEM_CHARS).collect();
        block.push_str(&format!("- [{}] {}\n", i + 1, text));
    }
    block.push_str(CONTEXT_SEPARATOR);
    block.push('\n');
    block
}
