//! Tree filters.
//!
//! Every filter is a post-order rewrite: a node is judged only after all of its
//! children were, so by the time a [`Filter`] sees a node its child list
//! already holds the survivors in their original order. The judgement is a
//! [`Verdict`]: keep the node (possibly after editing its own data), prune it
//! with its whole subtree, or replace it with one of its children.
//!
//! Filters compose as full passes, one after the other, through a [`Pipeline`].
//! Any pass may prune the root, in which case the result is `None`: an empty
//! outcome, not an error.

use indextree::{NodeEdge, NodeId};
use std::fmt;

use crate::debug;
use crate::dom::Document;

mod semantic;
mod visibility;

pub use semantic::{
    AttributeWhitelist, CollapseWrappers, EmptyNodes, PresentationalRoles, SEMANTIC_ATTRIBUTES,
    collapse_wrappers, filter_attributes, filter_empty, filter_presentational_roles,
};
pub use visibility::{
    CssHidden, NON_VISIBLE_TAGS, NonVisibleTags, ZeroDimensions, filter_css_hidden,
    filter_non_visible_tags, filter_zero_dimensions,
};

/// Fate of a node once its children have been rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    /// Remove the node and everything below it
    Prune,
    /// Put this child where the node was and drop the node
    Promote(NodeId),
}

/// A node-level rule applied by [`rewrite`].
pub trait Filter {
    /// Short name, for logs.
    fn name(&self) -> &'static str;

    /// Decide what happens to `id`. Its children have already been judged.
    ///
    /// The filter may edit the node's own data (attributes, styles...) but
    /// must not restructure the tree; that is what the verdict is for.
    fn judge(&self, doc: &mut Document, id: NodeId) -> Verdict;
}

/// Run one filter over the whole tree.
///
/// Returns `None` when the root itself is pruned.
pub fn rewrite<F: Filter + ?Sized>(mut doc: Document, filter: &F) -> Option<Document> {
    // Post-order work list; node ids stay valid because a node is only ever
    // removed after everything below it was visited.
    let order: Vec<NodeId> = doc
        .root
        .traverse(&doc.arena)
        .filter_map(|edge| match edge {
            NodeEdge::End(id) => Some(id),
            NodeEdge::Start(_) => None,
        })
        .collect();

    let mut pruned = 0usize;
    let mut promoted = 0usize;
    for id in order {
        match filter.judge(&mut doc, id) {
            Verdict::Keep => {}
            Verdict::Prune => {
                if id == doc.root {
                    debug!("{}: root pruned", filter.name());
                    return None;
                }
                id.remove_subtree(&mut doc.arena);
                pruned += 1;
            }
            Verdict::Promote(child) => {
                debug_assert_eq!(doc.parent(child), Some(id));
                child.detach(&mut doc.arena);
                if id == doc.root {
                    doc.root = child;
                } else {
                    id.insert_before(child, &mut doc.arena);
                }
                id.remove(&mut doc.arena);
                promoted += 1;
            }
        }
    }

    debug!(
        "{}: pruned {} subtree(s), promoted {} node(s)",
        filter.name(),
        pruned,
        promoted
    );
    Some(doc)
}

/// Run one filter over a copy of `doc`.
pub fn apply<F: Filter + ?Sized>(doc: &Document, filter: &F) -> Option<Document> {
    rewrite(doc.clone(), filter)
}

/// An ordered list of filters, each run as a full pass over the previous one's output.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Filter + Send + Sync>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn then(mut self, filter: impl Filter + Send + Sync + 'static) -> Self {
        self.stages.push(Box::new(filter));
        self
    }

    /// Append every stage of another pipeline.
    pub fn then_all(mut self, other: Pipeline) -> Self {
        self.stages.extend(other.stages);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run all stages, stopping early if one prunes the root.
    pub fn run(&self, doc: Document) -> Option<Document> {
        self.stages
            .iter()
            .try_fold(doc, |doc, stage| rewrite(doc, stage.as_ref()))
    }

    /// Like [`Pipeline::run`], leaving the input untouched.
    pub fn apply(&self, doc: &Document) -> Option<Document> {
        self.run(doc.clone())
    }

    /// Tag-based, then style-based, then geometry-based removal.
    pub fn visible() -> Self {
        Pipeline::new()
            .then(NonVisibleTags::default())
            .then(CssHidden::default())
            .then(ZeroDimensions)
    }

    /// Attribute whitelisting, presentational role stripping, empty-node
    /// removal, then wrapper collapsing. Whitelisting has to come first so the
    /// later stages see the reduced attribute sets.
    pub fn semantic() -> Self {
        Pipeline::new()
            .then(AttributeWhitelist::default())
            .then(PresentationalRoles)
            .then(EmptyNodes)
            .then(CollapseWrappers)
    }

    /// [`Pipeline::visible`] followed by [`Pipeline::semantic`].
    pub fn all() -> Self {
        Pipeline::visible().then_all(Pipeline::semantic())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|stage| stage.name()))
            .finish()
    }
}

/// Drop everything that does not render: non-content tags, hidden elements,
/// and elements laid out with zero size.
pub fn filter_visible(doc: &Document) -> Option<Document> {
    Pipeline::visible().apply(doc)
}

/// Reduce the tree to its semantic skeleton: keep only meaningful attributes,
/// drop empty nodes, collapse wrappers.
pub fn filter_semantic(doc: &Document) -> Option<Document> {
    Pipeline::semantic().apply(doc)
}

/// [`filter_visible`] followed by [`filter_semantic`].
pub fn filter_all(doc: &Document) -> Option<Document> {
    Pipeline::all().apply(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementData;
    use facet_testhelpers::test;

    /// Prunes every element with the given tag.
    struct DropTag(&'static str);

    impl Filter for DropTag {
        fn name(&self) -> &'static str {
            "drop-tag"
        }

        fn judge(&self, doc: &mut Document, id: NodeId) -> Verdict {
            match doc.element(id) {
                Some(elem) if elem.tag == self.0 => Verdict::Prune,
                _ => Verdict::Keep,
            }
        }
    }

    /// Records the order in which nodes are judged.
    struct Recorder(std::sync::Mutex<Vec<String>>);

    impl Filter for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn judge(&self, doc: &mut Document, id: NodeId) -> Verdict {
            let label = match doc.element(id) {
                Some(elem) => elem.tag.to_string(),
                None => doc.text(id).unwrap_or_default().to_string(),
            };
            self.0.lock().unwrap().push(label);
            Verdict::Keep
        }
    }

    fn sample() -> Document {
        let mut doc = Document::new(ElementData::new("body"));
        let root = doc.root;
        let nav = doc.append_element(root, ElementData::new("nav")).unwrap();
        doc.append_text(nav, "menu").unwrap();
        let main = doc.append_element(root, ElementData::new("main")).unwrap();
        doc.append_text(main, "content").unwrap();
        doc
    }

    #[test]
    fn test_rewrite_visits_children_first() {
        let recorder = Recorder(Default::default());
        rewrite(sample(), &recorder).unwrap();
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["menu", "nav", "content", "main", "body"]
        );
    }

    #[test]
    fn test_rewrite_prunes_subtree() {
        let doc = rewrite(sample(), &DropTag("nav")).unwrap();
        assert_eq!(doc.child_count(doc.root), 1);
        assert_eq!(doc.get_text(doc.root, ""), "content");
    }

    #[test]
    fn test_rewrite_root_pruned() {
        assert!(rewrite(sample(), &DropTag("body")).is_none());
    }

    #[test]
    fn test_pipeline_stops_when_root_goes() {
        let pipeline = Pipeline::new()
            .then(DropTag("body"))
            .then(DropTag("main"));
        assert_eq!(pipeline.len(), 2);
        assert!(pipeline.run(sample()).is_none());

        let pipeline = Pipeline::new().then(DropTag("nav")).then(DropTag("main"));
        let doc = pipeline.run(sample()).unwrap();
        assert_eq!(doc.child_count(doc.root), 0);
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let doc = sample();
        assert_eq!(Pipeline::new().apply(&doc), Some(doc));
    }

    #[test]
    fn test_preset_stage_names() {
        assert_eq!(
            format!("{:?}", Pipeline::all()),
            concat!(
                r#"["non-visible-tags", "css-hidden", "zero-dimensions", "#,
                r#""attribute-whitelist", "presentational-roles", "empty-nodes", "#,
                r#""collapse-wrappers"]"#,
            )
        );
    }

    #[test]
    fn test_filter_all_matches_composition() {
        let mut doc = Document::new(ElementData::new("div").with_attr("class", "page"));
        let root = doc.root;
        doc.append_element(root, ElementData::new("script"))
            .unwrap();
        let hidden = doc
            .append_element(root, ElementData::new("div").with_style("display", "none"))
            .unwrap();
        doc.append_text(hidden, "secret").unwrap();
        let wrapper = doc.append_element(root, ElementData::new("div")).unwrap();
        let button = doc
            .append_element(
                wrapper,
                ElementData::new("button")
                    .with_attr("role", "button")
                    .with_attr("class", "btn"),
            )
            .unwrap();
        doc.append_text(button, "Go").unwrap();

        let all = filter_all(&doc).unwrap();
        let composed = filter_visible(&doc)
            .as_ref()
            .and_then(filter_semantic)
            .unwrap();
        assert_eq!(all, composed);

        let root = all.root_element().unwrap();
        assert_eq!(root.tag, "button");
        assert_eq!(root.attr("role"), Some("button"));
        assert_eq!(root.attrs.len(), 1);
        assert_eq!(all.get_text(all.root, ""), "Go");
    }
}
