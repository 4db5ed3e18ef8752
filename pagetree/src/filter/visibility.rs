//! Filters that drop what the user cannot see.

use compact_str::CompactString;
use indexmap::IndexSet;
use indextree::NodeId;

use super::{Filter, Verdict, apply};
use crate::dom::{Document, NodeData, VisibilityRules};

/// Tags whose content never renders.
pub const NON_VISIBLE_TAGS: &[&str] = &[
    "script", "style", "head", "meta", "link", "title", "noscript", "template", "base",
];

/// Removes elements whose tag is in a non-rendering set. Text passes.
#[derive(Debug, Clone)]
pub struct NonVisibleTags {
    tags: IndexSet<CompactString>,
}

impl Default for NonVisibleTags {
    fn default() -> Self {
        Self::with_tags(NON_VISIBLE_TAGS)
    }
}

impl NonVisibleTags {
    /// Use a custom tag set instead of [`NON_VISIBLE_TAGS`].
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        NonVisibleTags {
            tags: tags
                .into_iter()
                .map(|t| CompactString::from(t.as_ref().to_ascii_lowercase()))
                .collect(),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl Filter for NonVisibleTags {
    fn name(&self) -> &'static str {
        "non-visible-tags"
    }

    fn judge(&self, doc: &mut Document, id: NodeId) -> Verdict {
        match doc.element(id) {
            Some(elem) if self.contains(&elem.tag) => Verdict::Prune,
            _ => Verdict::Keep,
        }
    }
}

/// Removes elements hidden by their computed style, by the `hidden`
/// attribute, or by being an `<input type="hidden">`.
#[derive(Debug, Clone, Default)]
pub struct CssHidden {
    pub rules: VisibilityRules,
}

impl CssHidden {
    pub fn new(rules: VisibilityRules) -> Self {
        CssHidden { rules }
    }
}

impl Filter for CssHidden {
    fn name(&self) -> &'static str {
        "css-hidden"
    }

    fn judge(&self, doc: &mut Document, id: NodeId) -> Verdict {
        let NodeData::Element(elem) = doc.get(id) else {
            return Verdict::Keep;
        };
        let hidden_input = elem.tag == "input"
            && elem
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"));
        if !elem.is_visible_with(&self.rules) || elem.attrs.contains_key("hidden") || hidden_input
        {
            Verdict::Prune
        } else {
            Verdict::Keep
        }
    }
}

/// Removes elements laid out with zero width or height. Elements that were
/// never laid out stay.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroDimensions;

impl Filter for ZeroDimensions {
    fn name(&self) -> &'static str {
        "zero-dimensions"
    }

    fn judge(&self, doc: &mut Document, id: NodeId) -> Verdict {
        if doc.has_zero_size(id) {
            Verdict::Prune
        } else {
            Verdict::Keep
        }
    }
}

pub fn filter_non_visible_tags(doc: &Document) -> Option<Document> {
    apply(doc, &NonVisibleTags::default())
}

pub fn filter_css_hidden(doc: &Document) -> Option<Document> {
    apply(doc, &CssHidden::default())
}

pub fn filter_zero_dimensions(doc: &Document) -> Option<Document> {
    apply(doc, &ZeroDimensions)
}
