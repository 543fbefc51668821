use crate::error::{LoaderError, LoaderResult};

use super::NodeId;

/// Read access to an element tree, enough to evaluate a [`Selector`].
pub(crate) trait ElementTree {
    fn tag(&self, node: NodeId) -> &str;
    fn element_id(&self, node: NodeId) -> Option<&str>;
    fn has_class(&self, node: NodeId, class: &str) -> bool;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        let tag = tree.tag(node);
        // Synthetic roots never match.
        if tag.starts_with('#') {
            return false;
        }
        if let Some(expected) = &self.tag
            && !expected.eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(expected) = &self.id
            && tree.element_id(node) != Some(expected.as_str())
        {
            return false;
        }
        self.classes.iter().all(|class| tree.has_class(node, class))
    }
}

/// Subset of CSS selectors: type, `*`, `.class`, `#id`, compounds of those,
/// the descendant combinator and comma-separated lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Vec<Compound>>,
}

impl Selector {
    pub fn parse(raw: &str) -> LoaderResult<Self> {
        let mut alternatives = Vec::new();
        for part in raw.split(',') {
            let compounds = part
                .split_whitespace()
                .map(parse_compound)
                .collect::<LoaderResult<Vec<_>>>()?;
            if compounds.is_empty() {
                return Err(LoaderError::invalid_argument(format!(
                    "empty selector in \"{raw}\""
                )));
            }
            alternatives.push(compounds);
        }
        Ok(Self { alternatives })
    }

    pub(crate) fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|chain| chain_matches(chain, tree, node))
    }
}

fn chain_matches<T: ElementTree + ?Sized>(chain: &[Compound], tree: &T, node: NodeId) -> bool {
    let Some((last, ancestors)) = chain.split_last() else {
        return false;
    };
    if !last.matches(tree, node) {
        return false;
    }

    let mut pending = ancestors.iter().rev().peekable();
    let mut cursor = tree.parent(node);
    while let Some(compound) = pending.peek() {
        let Some(current) = cursor else {
            return false;
        };
        if compound.matches(tree, current) {
            pending.next();
        }
        cursor = tree.parent(current);
    }
    true
}

fn parse_compound(raw: &str) -> LoaderResult<Compound> {
    let mut compound = Compound::default();
    let mut chars = raw.chars().peekable();

    if chars.peek() == Some(&'*') {
        chars.next();
    } else {
        let tag = take_ident(&mut chars);
        if !tag.is_empty() {
            compound.tag = Some(tag);
        }
    }

    while let Some(marker) = chars.next() {
        let ident = take_ident(&mut chars);
        if ident.is_empty() {
            return Err(LoaderError::invalid_argument(format!(
                "expected a name after '{marker}' in \"{raw}\""
            )));
        }
        match marker {
            '.' => compound.classes.push(ident),
            '#' => compound.id = Some(ident),
            other => {
                return Err(LoaderError::invalid_argument(format!(
                    "unsupported selector character '{other}' in \"{raw}\""
                )));
            }
        }
    }
    Ok(compound)
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            ident.push(ch);
            chars.next();
        } else {
            break;
        }
    }
    ident
}
