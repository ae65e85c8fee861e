use super::node::{GrammarKind, GrammarNode};

/// Derives the canonical identifier of a grammar node.
///
/// A group takes the literal of its first keyword child, since it has no name of
/// its own. Everything else prefers its declared name, then its literal, then its
/// type tag. Groups, blocks and arrays without a name or keyword resolve to an
/// empty string, which callers treat as "qualify by position only".
pub fn identifier(node: &GrammarNode) -> String {
    if let GrammarKind::Group { children } = &node.kind {
        let keyword = children.iter().find_map(|child| match &child.kind {
            GrammarKind::Keyword { value } if !value.is_empty() => Some(value.clone()),
            _ => None,
        });
        if let Some(keyword) = keyword {
            return keyword;
        }
    }

    if let Some(name) = node.name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    match &node.kind {
        GrammarKind::Keyword { value } | GrammarKind::Assignment { value } => value.clone(),
        GrammarKind::Group { .. } | GrammarKind::Block { .. } | GrammarKind::Array { .. } => {
            String::new()
        }
        other => other.type_tag().to_string(),
    }
}
