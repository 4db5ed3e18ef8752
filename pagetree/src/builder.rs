//! Tree construction from a stream of markup events.
//!
//! The builder keeps an explicit stack of open elements under an implicit
//! document container. It never fails: an end tag closes everything up to the
//! innermost open element of the same name, and one that matches nothing
//! closes every open element.

use compact_str::CompactString;
use indextree::NodeId;
use smallvec::SmallVec;

use crate::debug;
use crate::dom::{BoundingBox, Document, ElementData, MetaValue, NodeData};

/// One event produced by a markup tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent {
    StartTag {
        name: CompactString,
        attrs: Vec<(CompactString, CompactString)>,
        self_closing: bool,
    },
    EndTag {
        name: CompactString,
    },
    Text(CompactString),
    Comment(CompactString),
}

impl MarkupEvent {
    pub fn start(name: &str, attrs: &[(&str, &str)]) -> Self {
        MarkupEvent::StartTag {
            name: name.into(),
            attrs: attrs.iter().map(|&(k, v)| (k.into(), v.into())).collect(),
            self_closing: false,
        }
    }

    pub fn self_closing(name: &str, attrs: &[(&str, &str)]) -> Self {
        MarkupEvent::StartTag {
            name: name.into(),
            attrs: attrs.iter().map(|&(k, v)| (k.into(), v.into())).collect(),
            self_closing: true,
        }
    }

    pub fn end(name: &str) -> Self {
        MarkupEvent::EndTag { name: name.into() }
    }

    pub fn text(content: &str) -> Self {
        MarkupEvent::Text(content.into())
    }
}

/// Builder configuration.
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
    /// Turn annotation attributes from instrumented page dumps into rendering data:
    /// `backend_node_id` becomes metadata, `bounding_box_rect="x,y,w,h"` becomes bounds,
    /// inline `style` declarations become styles, and `<text>` becomes `<span>`.
    pub lift_annotations: bool,
}

impl BuilderOptions {
    pub fn annotated() -> Self {
        BuilderOptions {
            lift_annotations: true,
        }
    }
}

/// HTML5 void elements that never have content
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Incremental tree builder. Feed events with [`TreeBuilder::process`], then
/// call [`TreeBuilder::finish`].
pub struct TreeBuilder {
    doc: Document,

    /// Implicit document container; becomes the root only when needed
    container: NodeId,

    /// Open elements with the tag name they were opened under, innermost
    /// last. The container is never on this stack.
    open: SmallVec<[(NodeId, CompactString); 16]>,

    options: BuilderOptions,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(BuilderOptions::default())
    }
}

impl TreeBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        let doc = Document::new(ElementData::new("html"));
        let container = doc.root;
        TreeBuilder {
            doc,
            container,
            open: SmallVec::new(),
            options,
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().map_or(self.container, |(id, _)| *id)
    }

    pub fn process(&mut self, event: MarkupEvent) {
        match event {
            MarkupEvent::StartTag {
                name,
                attrs,
                self_closing,
            } => self.start_tag(&name, attrs, self_closing),
            MarkupEvent::EndTag { name } => self.end_tag(&name),
            MarkupEvent::Text(content) => self.text(content),
            MarkupEvent::Comment(_) => {}
        }
    }

    fn start_tag(
        &mut self,
        name: &str,
        attrs: Vec<(CompactString, CompactString)>,
        self_closing: bool,
    ) {
        let mut elem = ElementData::new(name);
        // lifting may rename the element; end tags still use the source name
        let source_name = elem.tag.clone();
        for (key, value) in attrs {
            // first occurrence wins, as in HTML
            elem.attrs.entry(key).or_insert(value);
        }
        if self.options.lift_annotations {
            lift_annotations(&mut elem);
        }

        let is_void = self_closing || is_void_element(&elem.tag);
        let parent = self.current();
        let id = self.doc.arena.new_node(NodeData::Element(elem));
        parent.append(id, &mut self.doc.arena);
        if !is_void {
            self.open.push((id, source_name));
        }
    }

    fn end_tag(&mut self, name: &str) {
        let name = name.to_ascii_lowercase();
        let matching = self.open.iter().rposition(|(_, open)| *open == name);

        match matching {
            Some(pos) => {
                if pos + 1 != self.open.len() {
                    debug!(
                        "</{}> implicitly closes {} open element(s)",
                        name,
                        self.open.len() - pos - 1
                    );
                }
                self.open.truncate(pos);
            }
            None => {
                debug!("unmatched </{}> closes all {} open element(s)", name, self.open.len());
                self.open.clear();
            }
        }
    }

    fn text(&mut self, content: CompactString) {
        if content.is_empty() {
            return;
        }
        let parent = self.current();
        if parent == self.container && content.trim().is_empty() {
            return;
        }

        // Merge with a preceding text run
        let last = self.doc.arena[parent].last_child();
        if let Some(last) = last
            && let NodeData::Text(existing) = self.doc.arena[last].get_mut()
        {
            existing.push_str(&content);
            return;
        }

        let id = self.doc.arena.new_node(NodeData::Text(content));
        parent.append(id, &mut self.doc.arena);
    }

    /// Close everything still open and return the tree.
    ///
    /// A single top-level element becomes the root; anything else stays wrapped
    /// in a synthesized `html` root.
    pub fn finish(self) -> Document {
        let Document { mut arena, root } = self.doc;
        let container = root;

        let top: SmallVec<[NodeId; 2]> = container.children(&arena).take(2).collect();
        if let [only] = top[..]
            && matches!(arena[only].get(), NodeData::Element(_))
        {
            only.detach(&mut arena);
            container.remove(&mut arena);
            return Document { arena, root: only };
        }

        debug!(
            "wrapping {} top-level nodes in a synthesized root",
            container.children(&arena).count()
        );
        Document {
            arena,
            root: container,
        }
    }
}

/// Build a tree from an event stream with default options.
pub fn build(events: impl IntoIterator<Item = MarkupEvent>) -> Document {
    build_with(events, &BuilderOptions::default())
}

/// Build a tree from an event stream.
pub fn build_with(
    events: impl IntoIterator<Item = MarkupEvent>,
    options: &BuilderOptions,
) -> Document {
    let mut builder = TreeBuilder::new(options.clone());
    for event in events {
        builder.process(event);
    }
    builder.finish()
}

fn lift_annotations(elem: &mut ElementData) {
    if elem.tag == "text" {
        elem.tag = "span".into();
    }

    if let Some(raw) = elem.attrs.shift_remove("backend_node_id") {
        let value = match raw.trim().parse::<i64>() {
            Ok(id) => MetaValue::Int(id),
            Err(_) => MetaValue::Text(raw),
        };
        elem.metadata.insert("backend_node_id".into(), value);
    }

    if let Some(raw) = elem.attrs.shift_remove("bounding_box_rect") {
        let numbers: Option<Vec<f64>> = raw.split(',').map(|p| p.trim().parse().ok()).collect();
        match numbers.as_deref().and_then(BoundingBox::from_rect) {
            Some(bounds) => elem.bounds = Some(bounds),
            None => debug!("unreadable bounding_box_rect {:?}", raw),
        }
    }

    if let Some(style) = elem.attrs.get("style") {
        for declaration in style.split(';') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let property = property.trim().to_ascii_lowercase();
            if property.is_empty() {
                continue;
            }
            elem.styles.insert(property.into(), value.trim().into());
        }
    }
}
