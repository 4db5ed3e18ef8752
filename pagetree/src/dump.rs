//! Indented outline of a tree, for debugging and test fixtures.

use indextree::{NodeEdge, NodeId};
use std::fmt;

use crate::dom::{Document, NodeData};

/// Displays a subtree as an indented outline:
///
/// ```text
/// <div role="main" [0,0 800x600]>
///   TEXT: "Hello"
///   <input type="text" />
/// </div>
/// ```
pub struct TreeDump<'a> {
    doc: &'a Document,
    from: NodeId,
}

impl fmt::Display for TreeDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = &self.doc.arena;
        let mut depth = 0usize;
        for edge in self.from.traverse(arena) {
            match edge {
                NodeEdge::Start(id) => {
                    let indent = "  ".repeat(depth);
                    match arena[id].get() {
                        NodeData::Text(text) => writeln!(f, "{indent}TEXT: {text:?}")?,
                        NodeData::Element(elem) => {
                            write!(f, "{indent}<{}", elem.tag)?;
                            for (name, value) in &elem.attrs {
                                write!(f, " {name}={value:?}")?;
                            }
                            if let Some(b) = elem.bounds {
                                write!(f, " [{},{} {}x{}]", b.x, b.y, b.width, b.height)?;
                            }
                            if arena[id].first_child().is_some() {
                                writeln!(f, ">")?;
                                depth += 1;
                            } else {
                                writeln!(f, " />")?;
                            }
                        }
                    }
                }
                NodeEdge::End(id) => {
                    if let NodeData::Element(elem) = arena[id].get()
                        && arena[id].first_child().is_some()
                    {
                        depth -= 1;
                        writeln!(f, "{}</{}>", "  ".repeat(depth), elem.tag)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Document {
    /// Outline of the whole tree.
    pub fn dump(&self) -> TreeDump<'_> {
        self.dump_from(self.root)
    }

    /// Outline of the subtree at `id`.
    pub fn dump_from(&self, id: NodeId) -> TreeDump<'_> {
        TreeDump { doc: self, from: id }
    }
}
