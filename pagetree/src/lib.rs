//! Rendered-page trees: build them, decode them from browser snapshots, filter them.
//!
//! pagetree provides:
//! - **Tree model**: arena-backed elements and text carrying computed styles,
//!   bounding boxes and source metadata
//! - **Markup building**: a permissive tree builder over markup events, with an
//!   html5ever tokenizer front end
//! - **Snapshot decoding**: Chrome DevTools `DOMSnapshot.captureSnapshot` results
//!   (string-interned, columnar) into the same tree model
//! - **Filters**: post-order rewrites that strip invisible and meaningless nodes
//!
//! # Example
//!
//! ```rust
//! use pagetree::{filter_all, parse_html};
//!
//! let doc = parse_html(
//!     r#"<div class="page">
//!          <script>track()</script>
//!          <div style="display: none">menu</div>
//!          <div><button role="button" class="btn">Click</button></div>
//!        </div>"#,
//! );
//!
//! let filtered = filter_all(&doc).expect("the button survives");
//! let root = filtered.root_element().unwrap();
//! assert_eq!(root.tag, "button");
//! assert_eq!(root.attr("role"), Some("button"));
//! assert_eq!(filtered.get_text(filtered.root, ""), "Click");
//! ```

mod tracing_macros;

pub mod builder;
pub mod dom;
mod dump;
pub mod filter;
mod parser;
pub mod snapshot;

pub use builder::{BuilderOptions, MarkupEvent, TreeBuilder, build, build_with};
pub use dom::{
    Attributes, BoundingBox, Document, ElementData, MetaValue, Metadata, NodeData, Styles,
    TreeError, VisibilityRules,
};
pub use dump::TreeDump;
pub use filter::{Filter, Pipeline, Verdict, filter_all, filter_semantic, filter_visible};
pub use parser::{parse_html, tokenize};
pub use snapshot::{
    CaptureSnapshot, DEFAULT_COMPUTED_STYLES, SnapshotDecoder, SnapshotError, decode_snapshot,
};

// Node handles come from the arena crate
pub use indextree::NodeId;
