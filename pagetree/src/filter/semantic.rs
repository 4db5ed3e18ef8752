//! Filters that strip a tree down to what carries meaning.

use compact_str::CompactString;
use indexmap::IndexSet;
use indextree::NodeId;

use super::{Filter, Verdict, apply};
use crate::dom::{Document, NodeData};

/// Attributes kept by the default [`AttributeWhitelist`]: roles, ARIA state,
/// and form or link semantics.
pub const SEMANTIC_ATTRIBUTES: &[&str] = &[
    "role",
    "aria-label",
    "aria-labelledby",
    "aria-describedby",
    "aria-checked",
    "aria-selected",
    "aria-expanded",
    "aria-hidden",
    "aria-disabled",
    "type",
    "name",
    "placeholder",
    "value",
    "alt",
    "title",
    "href",
    "disabled",
    "checked",
    "selected",
];

/// Keeps every node, dropping attributes outside the keep-set.
#[derive(Debug, Clone)]
pub struct AttributeWhitelist {
    keep: IndexSet<CompactString>,
}

impl Default for AttributeWhitelist {
    fn default() -> Self {
        Self::new(SEMANTIC_ATTRIBUTES)
    }
}

impl AttributeWhitelist {
    pub fn new<I, S>(keep: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        AttributeWhitelist {
            keep: keep
                .into_iter()
                .map(|name| CompactString::from(name.as_ref()))
                .collect(),
        }
    }

    pub fn keeps(&self, name: &str) -> bool {
        self.keep.contains(name)
    }
}

impl Filter for AttributeWhitelist {
    fn name(&self) -> &'static str {
        "attribute-whitelist"
    }

    fn judge(&self, doc: &mut Document, id: NodeId) -> Verdict {
        if let Some(elem) = doc.element_mut(id) {
            elem.attrs.retain(|name, _| self.keep.contains(name.as_str()));
        }
        Verdict::Keep
    }
}

/// Drops `role="none"` and `role="presentation"`, which declare the element
/// meaningless. The element itself stays.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresentationalRoles;

impl Filter for PresentationalRoles {
    fn name(&self) -> &'static str {
        "presentational-roles"
    }

    fn judge(&self, doc: &mut Document, id: NodeId) -> Verdict {
        if let Some(elem) = doc.element_mut(id)
            && elem.attr("role").is_some_and(|role| {
                let role = role.trim();
                role.eq_ignore_ascii_case("none") || role.eq_ignore_ascii_case("presentation")
            })
        {
            elem.attrs.shift_remove("role");
        }
        Verdict::Keep
    }
}

/// Removes elements left with neither attributes nor children, and text that
/// is only whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyNodes;

impl Filter for EmptyNodes {
    fn name(&self) -> &'static str {
        "empty-nodes"
    }

    fn judge(&self, doc: &mut Document, id: NodeId) -> Verdict {
        let empty = match doc.get(id) {
            NodeData::Text(content) => content.trim().is_empty(),
            NodeData::Element(elem) => elem.attrs.is_empty() && doc.child_count(id) == 0,
        };
        if empty { Verdict::Prune } else { Verdict::Keep }
    }
}

/// Replaces an attribute-less element that has exactly one child, an element,
/// with that child. Chains of wrappers collapse to the innermost content.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollapseWrappers;

impl Filter for CollapseWrappers {
    fn name(&self) -> &'static str {
        "collapse-wrappers"
    }

    fn judge(&self, doc: &mut Document, id: NodeId) -> Verdict {
        let Some(elem) = doc.element(id) else {
            return Verdict::Keep;
        };
        if !elem.attrs.is_empty() {
            return Verdict::Keep;
        }
        let mut children = doc.children(id);
        match (children.next(), children.next()) {
            (Some(only), None) if doc.element(only).is_some() => Verdict::Promote(only),
            _ => Verdict::Keep,
        }
    }
}

/// Keep only [`SEMANTIC_ATTRIBUTES`].
pub fn filter_attributes(doc: &Document) -> Option<Document> {
    apply(doc, &AttributeWhitelist::default())
}

pub fn filter_presentational_roles(doc: &Document) -> Option<Document> {
    apply(doc, &PresentationalRoles)
}

pub fn filter_empty(doc: &Document) -> Option<Document> {
    apply(doc, &EmptyNodes)
}

pub fn collapse_wrappers(doc: &Document) -> Option<Document> {
    apply(doc, &CollapseWrappers)
}
