//! Arena-based page tree carrying rendering metadata.
//!
//! This module provides the core Document representation used throughout pagetree.
//! Key features:
//! - **indextree Arena**: All nodes in contiguous memory, addressed by stable `NodeId`s
//! - **Exclusive ownership**: a node sits in at most one parent's child list, by construction
//! - **Rendering data**: computed styles, bounding boxes and source metadata on every element
//!
//! The same representation is produced by the markup builder and the snapshot
//! decoder, and consumed by the filters.

use compact_str::CompactString;
use facet::Facet;
use indexmap::IndexMap;
use indextree::{Arena, NodeError, NodeId};
use std::fmt;

use crate::trace;

/// Element attributes, keyed by attribute name.
pub type Attributes = IndexMap<CompactString, CompactString>;

/// Computed styles, keyed by CSS property name.
pub type Styles = IndexMap<CompactString, CompactString>;

/// Source-specific values carried through untouched (backend ids, row indices...).
pub type Metadata = IndexMap<CompactString, MetaValue>;

/// Errors raised by tree mutations.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum TreeError {
    /// text nodes cannot have children
    TextParent,

    /// appending would make a node its own ancestor
    Cycle,

    /// the document root cannot be moved under another node
    RootNotMovable,

    /// node was removed from the arena
    Removed,

    /// node is not a child of the given parent
    NotFound,
}

impl TreeError {
    /// True for the "no such child" case of [`Document::remove`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound)
    }
}

/// Axis-aligned rectangle describing an element's rendered position and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        BoundingBox {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from `[x, y, width, height]`.
    ///
    /// Returns `None` for the wrong arity, non-finite numbers, or negative extents.
    pub fn from_rect(rect: &[f64]) -> Option<Self> {
        let &[x, y, width, height] = rect else {
            return None;
        };
        if ![x, y, width, height].iter().all(|v| v.is_finite()) || width < 0.0 || height < 0.0 {
            return None;
        }
        Some(BoundingBox::new(x, y, width, height))
    }

    /// Collapse a quadrilateral `[x1, y1, x2, y2, x3, y3, x4, y4]` to the
    /// axis-aligned box spanning its corners.
    pub fn from_quad(quad: &[f64]) -> Option<Self> {
        if quad.len() != 8 || !quad.iter().all(|v| v.is_finite()) {
            return None;
        }
        let xs = quad.iter().step_by(2).copied();
        let ys = quad.iter().skip(1).step_by(2).copied();
        let (min_x, max_x) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let (min_y, max_y) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        Some(BoundingBox::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Zero width or zero height.
    pub fn is_zero_size(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// Opaque metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Int(i64),
    Text(CompactString),
}

impl MetaValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(v) => Some(*v),
            MetaValue::Text(_) => None,
        }
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.into())
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Int(v) => write!(f, "{v}"),
            MetaValue::Text(t) => write!(f, "{t}"),
        }
    }
}

/// Thresholds used by [`ElementData::is_visible_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityRules {
    /// Opacity at or below this value counts as invisible.
    pub opacity_epsilon: f64,
    /// Treat `visibility: collapse` like `visibility: hidden`.
    pub collapse_hides: bool,
}

impl Default for VisibilityRules {
    fn default() -> Self {
        VisibilityRules {
            opacity_epsilon: 0.01,
            collapse_hides: true,
        }
    }
}

/// Element data: tag, attributes, and what the renderer computed for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: CompactString,

    /// Authored attributes
    pub attrs: Attributes,

    /// Computed styles (empty when none were captured)
    pub styles: Styles,

    /// Layout box; `None` when the element was never laid out
    pub bounds: Option<BoundingBox>,

    /// Source-specific data, never interpreted by the filters
    pub metadata: Metadata,
}

impl ElementData {
    /// Create an element with the given tag, lowercased.
    pub fn new(tag: impl AsRef<str>) -> Self {
        ElementData {
            tag: CompactString::from(tag.as_ref().to_ascii_lowercase()),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.attrs.insert(name.as_ref().into(), value.as_ref().into());
        self
    }

    pub fn with_style(mut self, property: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.styles
            .insert(property.as_ref().into(), value.as_ref().into());
        self
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_metadata(mut self, key: impl AsRef<str>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.as_ref().into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(|v| v.as_str())
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(|v| v.as_str())
    }

    /// Visible under the default [`VisibilityRules`].
    pub fn is_visible(&self) -> bool {
        self.is_visible_with(&VisibilityRules::default())
    }

    /// False for `display: none`, `visibility: hidden` (and `collapse` when the
    /// rules say so), or an opacity at or below the epsilon. Missing or
    /// unparsable opacity counts as fully opaque.
    pub fn is_visible_with(&self, rules: &VisibilityRules) -> bool {
        let style_is = |property: &str, value: &str| {
            self.style(property)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(value))
        };

        if style_is("display", "none") {
            return false;
        }
        if style_is("visibility", "hidden") {
            return false;
        }
        if rules.collapse_hides && style_is("visibility", "collapse") {
            return false;
        }
        if let Some(opacity) = self.style("opacity")
            && let Ok(opacity) = opacity.trim().parse::<f64>()
            && opacity <= rules.opacity_epsilon
        {
            return false;
        }
        true
    }

    /// Laid out with zero width or height. Absent bounds are not zero-size.
    pub fn has_zero_size(&self) -> bool {
        self.bounds.is_some_and(|b| b.is_zero_size())
    }
}

/// What goes in each arena slot
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Element with tag, attributes and rendering data
    Element(ElementData),
    /// Text content; always a leaf
    Text(CompactString),
}

impl NodeData {
    pub fn as_element(&self) -> Option<&ElementData> {
        match self {
            NodeData::Element(elem) => Some(elem),
            NodeData::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match self {
            NodeData::Element(elem) => Some(elem),
            NodeData::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeData::Text(t) => Some(t.as_str()),
            NodeData::Element(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeData::Text(_))
    }
}

/// Document = Arena + the id of its root element
#[derive(Debug, Clone)]
pub struct Document {
    /// THE tree - all nodes live here, including detached ones
    pub arena: Arena<NodeData>,

    /// Root node (always an element)
    pub root: NodeId,
}

impl Document {
    /// Create a document holding a single root element.
    pub fn new(root: ElementData) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData::Element(root));
        Document { arena, root }
    }

    /// Get immutable reference to node data
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    /// Get mutable reference to node data
    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).as_element()
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).as_element_mut()
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).as_text()
    }

    pub fn root_element(&self) -> Option<&ElementData> {
        self.element(self.root)
    }

    /// Allocate a detached element. Attach it with [`Document::append`].
    pub fn new_element(&mut self, data: ElementData) -> NodeId {
        self.arena.new_node(NodeData::Element(data))
    }

    /// Allocate a detached text node.
    pub fn new_text(&mut self, content: impl Into<CompactString>) -> NodeId {
        self.arena.new_node(NodeData::Text(content.into()))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// Iterate children of a node
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        id.children(&self.arena).count()
    }

    /// Pre-order iteration over `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    /// Number of nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        self.descendants(self.root).count()
    }

    /// Make `child` the last child of `parent`, detaching it from its previous
    /// parent first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if self.arena[parent].is_removed() || self.arena[child].is_removed() {
            return Err(TreeError::Removed);
        }
        if self.get(parent).is_text() {
            return Err(TreeError::TextParent);
        }
        if child == self.root {
            return Err(TreeError::RootNotMovable);
        }
        parent
            .checked_append(child, &mut self.arena)
            .map_err(|err| match err {
                NodeError::Removed => TreeError::Removed,
                _ => TreeError::Cycle,
            })?;
        trace!("appended {:?} under {:?}", child, parent);
        Ok(())
    }

    /// Allocate an element and append it under `parent`.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        data: ElementData,
    ) -> Result<NodeId, TreeError> {
        let id = self.new_element(data);
        self.append(parent, id)?;
        Ok(id)
    }

    /// Allocate a text node and append it under `parent`.
    pub fn append_text(
        &mut self,
        parent: NodeId,
        content: impl Into<CompactString>,
    ) -> Result<NodeId, TreeError> {
        let id = self.new_text(content);
        self.append(parent, id)?;
        Ok(id)
    }

    /// Detach `child` (with its subtree) from `parent`.
    ///
    /// The subtree stays allocated and can be appended elsewhere.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if self.arena[parent].is_removed() || self.arena[child].is_removed() {
            return Err(TreeError::Removed);
        }
        if self.arena[child].parent() != Some(parent) {
            return Err(TreeError::NotFound);
        }
        child.detach(&mut self.arena);
        Ok(())
    }

    /// Concatenate every text node under `id` in document order, joined by `separator`.
    pub fn get_text(&self, id: NodeId, separator: &str) -> String {
        let parts: Vec<&str> = id
            .descendants(&self.arena)
            .filter_map(|node| self.text(node))
            .collect();
        parts.join(separator)
    }

    /// Text nodes are always visible; elements defer to [`ElementData::is_visible`].
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.element(id).is_none_or(|elem| elem.is_visible())
    }

    /// Text nodes never have zero size; elements defer to [`ElementData::has_zero_size`].
    pub fn has_zero_size(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|elem| elem.has_zero_size())
    }

    /// Structural comparison of the subtree at `a` with the subtree at `b` in `other`.
    pub fn subtree_eq(&self, a: NodeId, other: &Document, b: NodeId) -> bool {
        let mut stack = vec![(a, b)];
        while let Some((a, b)) = stack.pop() {
            if self.get(a) != other.get(b) {
                return false;
            }
            let mut left = a.children(&self.arena);
            let mut right = b.children(&other.arena);
            loop {
                match (left.next(), right.next()) {
                    (Some(l), Some(r)) => stack.push((l, r)),
                    (None, None) => break,
                    _ => return false,
                }
            }
        }
        true
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new(ElementData::new("div"));
        let root = doc.root;
        let section = doc
            .append_element(root, ElementData::new("section"))
            .unwrap();
        doc.append_text(section, "Hello").unwrap();
        let button = doc
            .append_element(root, ElementData::new("button").with_attr("role", "button"))
            .unwrap();
        doc.append_text(button, "Click").unwrap();
        (doc, section, button)
    }

    #[test]
    fn test_new_lowercases_tag() {
        let elem = ElementData::new("DIV");
        assert_eq!(elem.tag, "div");
    }

    #[test]
    fn test_append_keeps_order() {
        let (doc, section, button) = sample();
        let children: Vec<_> = doc.children(doc.root).collect();
        assert_eq!(children, vec![section, button]);
    }

    #[test]
    fn test_append_moves_node() {
        let (mut doc, section, button) = sample();
        doc.append(section, button).unwrap();
        assert_eq!(doc.child_count(doc.root), 1);
        assert_eq!(doc.parent(button), Some(section));
        assert_eq!(doc.get_text(doc.root, "|"), "Hello|Click");
    }

    #[test]
    fn test_append_rejects_cycle() {
        let (mut doc, section, _) = sample();
        let inner = doc.append_element(section, ElementData::new("p")).unwrap();
        assert_eq!(doc.append(inner, section), Err(TreeError::Cycle));
        assert_eq!(doc.append(section, section), Err(TreeError::Cycle));
    }

    #[test]
    fn test_append_rejects_root() {
        let (mut doc, section, _) = sample();
        assert_eq!(doc.append(section, doc.root), Err(TreeError::RootNotMovable));
    }

    #[test]
    fn test_append_to_text_fails() {
        let (mut doc, section, _) = sample();
        let text = doc.children(section).next().unwrap();
        let span = doc.new_element(ElementData::new("span"));
        assert_eq!(doc.append(text, span), Err(TreeError::TextParent));
    }

    #[test]
    fn test_remove() {
        let (mut doc, section, button) = sample();
        doc.remove(doc.root, section).unwrap();
        assert_eq!(doc.children(doc.root).collect::<Vec<_>>(), vec![button]);
        assert_eq!(doc.parent(section), None);

        let err = doc.remove(doc.root, section).unwrap_err();
        assert!(err.is_not_found());

        // detached subtrees can be re-attached
        doc.append(button, section).unwrap();
        assert_eq!(doc.get_text(doc.root, ""), "ClickHello");
    }

    #[test]
    fn test_get_text_separator() {
        let (doc, _, _) = sample();
        assert_eq!(doc.get_text(doc.root, ""), "HelloClick");
        assert_eq!(doc.get_text(doc.root, " "), "Hello Click");
    }

    #[test]
    fn test_visibility_rules() {
        assert!(ElementData::new("div").is_visible());
        assert!(!ElementData::new("div").with_style("display", "none").is_visible());
        assert!(!ElementData::new("div").with_style("display", " NONE ").is_visible());
        assert!(!ElementData::new("div").with_style("visibility", "hidden").is_visible());
        assert!(!ElementData::new("div").with_style("visibility", "collapse").is_visible());
        assert!(!ElementData::new("div").with_style("opacity", "0").is_visible());
        assert!(!ElementData::new("div").with_style("opacity", "0.01").is_visible());
        assert!(ElementData::new("div").with_style("opacity", "0.5").is_visible());
        assert!(ElementData::new("div").with_style("opacity", "auto").is_visible());

        let lenient = VisibilityRules {
            collapse_hides: false,
            ..Default::default()
        };
        assert!(
            ElementData::new("tr")
                .with_style("visibility", "collapse")
                .is_visible_with(&lenient)
        );
    }

    #[test]
    fn test_zero_size_vs_absent() {
        let absent = ElementData::new("div");
        assert!(!absent.has_zero_size());

        let zero = ElementData::new("div").with_bounds(BoundingBox::new(5.0, 5.0, 0.0, 10.0));
        assert!(zero.has_zero_size());

        let sized = ElementData::new("div").with_bounds(BoundingBox::new(0.0, 0.0, 3.0, 4.0));
        assert!(!sized.has_zero_size());
    }

    #[test]
    fn test_bounding_box_from_quad() {
        let quad = [0.0, 0.0, 10.0, 0.0, 10.0, 5.0, 0.0, 5.0];
        assert_eq!(
            BoundingBox::from_quad(&quad),
            Some(BoundingBox::new(0.0, 0.0, 10.0, 5.0))
        );

        // rotated quad collapses to its extent
        let rotated = [5.0, 0.0, 10.0, 5.0, 5.0, 10.0, 0.0, 5.0];
        assert_eq!(
            BoundingBox::from_quad(&rotated),
            Some(BoundingBox::new(0.0, 0.0, 10.0, 10.0))
        );

        assert_eq!(BoundingBox::from_quad(&[1.0, 2.0]), None);
        assert_eq!(BoundingBox::from_rect(&[0.0, 0.0, -1.0, 2.0]), None);
    }

    #[test]
    fn test_bounding_box_geometry() {
        let b = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(b.area(), 5000.0);
        assert_eq!(b.center(), (60.0, 45.0));
        assert!(b.contains(10.0, 20.0));
        assert!(!b.contains(111.0, 20.0));
        assert!(b.intersects(&BoundingBox::new(100.0, 60.0, 20.0, 20.0)));
        assert!(!b.intersects(&BoundingBox::new(200.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn test_structural_equality() {
        let (a, _, _) = sample();
        let (b, _, _) = sample();
        assert_eq!(a, b);

        let (mut c, section, _) = sample();
        c.append_text(section, "!").unwrap();
        assert_ne!(a, c);
    }
}
