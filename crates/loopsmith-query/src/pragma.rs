use loopsmith_ir::{NodeId, Tree, Xcode};

/// Length of `!$<prefix> ` plus the trailing ` &` of a continued directive line.
const CONTINUATION_OVERHEAD: usize = 5;

fn is_reserved(text: &str, reserved_prefix: &str) -> bool {
    text.split_whitespace()
        .next()
        .is_some_and(|head| head.eq_ignore_ascii_case(reserved_prefix))
}

fn delete_matching(tree: &mut Tree, start: Option<NodeId>, keywords: &[&str], reserved_prefix: &str, forward: bool) {
    let mut cursor = start;

    while let Some(pragma) = cursor.filter(|node| tree.is(*node, Xcode::PragmaStatement)) {
        let text = tree.value(pragma);
        if is_reserved(text, reserved_prefix) {
            break;
        }

        let doomed = keywords.iter().any(|keyword| text.contains(keyword));
        cursor = if forward {
            tree.next_sibling(pragma)
        } else {
            tree.prev_sibling(pragma)
        };
        if doomed {
            tree.delete(pragma);
        }
    }
}

/// Deletes the pragmas adjacent to `loop_` that mention one of the keywords.
///
/// The scan runs outwards in both directions over consecutive pragma siblings and stops at
/// the first pragma carrying `reserved_prefix`, which is never deleted.
pub fn clean_pragmas(tree: &mut Tree, loop_: NodeId, previous: &[&str], next: &[&str], reserved_prefix: &str) {
    if !tree.is(loop_, Xcode::DoStatement) {
        return;
    }

    let before = tree.prev_sibling(loop_);
    delete_matching(tree, before, previous, reserved_prefix, false);
    let after = tree.next_sibling(loop_);
    delete_matching(tree, after, next, reserved_prefix, true);
}

/// Nearest pragma before `from` whose text contains `keyword`, looking through previous
/// siblings first and then up through each ancestor and its previous siblings.
pub fn find_previous_pragma(tree: &Tree, from: NodeId, keyword: &str) -> Option<NodeId> {
    let keyword = keyword.to_ascii_lowercase();
    let matches = |node: NodeId| {
        tree.is(node, Xcode::PragmaStatement) && tree.value(node).to_ascii_lowercase().contains(&keyword)
    };

    std::iter::once(from)
        .chain(tree.ancestors(from))
        .find_map(|anchor| {
            let own = (anchor != from && matches(anchor)).then_some(anchor);
            own.or_else(|| {
                tree.preceding_siblings(anchor)
                    .iter()
                    .rev()
                    .find(|sibling| matches(**sibling))
                    .copied()
            })
        })
}

/// First word of a pragma, empty when the node is not a pragma.
pub fn pragma_prefix(tree: &Tree, pragma: NodeId) -> &str {
    if !tree.is(pragma, Xcode::PragmaStatement) {
        return "";
    }

    tree.value(pragma).split(' ').next().unwrap_or_default()
}

/// Strips a trailing `!` comment.
pub fn drop_ending_comment(text: &str) -> &str {
    match text.find('!') {
        Some(index) if index > 0 => text[..index].trim(),
        _ => text,
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    (0..=index.min(text.len()))
        .rev()
        .find(|i| text.is_char_boundary(*i))
        .unwrap_or(0)
}

/// Splits a directive into chunks that fit `max_columns` once prefixed and continued.
///
/// Each chunk breaks at the last space within the budget, else after the last comma, else at
/// the budget itself.
pub fn split_by_length(text: &str, max_columns: usize, prefix: &str) -> Vec<String> {
    let budget = max_columns.saturating_sub(prefix.len() + CONTINUATION_OVERHEAD).max(1);
    let mut rest = drop_ending_comment(text).trim();
    let mut chunks = Vec::new();

    while rest.len() > budget {
        let limit = floor_char_boundary(rest, budget).max(rest.chars().next().map_or(1, char::len_utf8));
        let window = &rest[..limit];

        let (chunk, remainder) = match window.rfind(' ').filter(|index| *index > 0) {
            Some(index) => (&rest[..index], &rest[index..]),
            None => match window.rfind(',') {
                Some(index) => (&rest[..=index], &rest[index + 1..]),
                None => (window, &rest[limit..]),
            },
        };

        chunks.push(chunk.trim_end().to_string());
        rest = remainder.trim_start();
    }

    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }

    chunks
}
