//! Decoding of columnar browser snapshots into page trees.
//!
//! The input is the shape returned by the Chrome DevTools
//! `DOMSnapshot.captureSnapshot` command: a shared string table, a node table
//! stored as parallel columns (one entry per node row), and a sparse layout
//! table correlating some rows with geometry and computed styles.
//!
//! Decoding happens in passes:
//! 1. validate column lengths and parent references (range and cycles)
//! 2. allocate one element or text node per row, in row order
//! 3. link each row under its parent, in row order
//! 4. attach bounds and styles from the layout table
//!
//! Any inconsistency is a [`SnapshotError`]: the data is machine-generated, so
//! a bad reference means the source broke its contract and there is nothing
//! sensible to recover.

use compact_str::CompactString;
use facet::Facet;
use indextree::{Arena, NodeId};

use crate::dom::{BoundingBox, Document, ElementData, MetaValue, NodeData, Styles};
use crate::{debug, trace};

/// Computed styles requested when none are specified: the ones the visibility
/// filters read.
pub const DEFAULT_COMPUTED_STYLES: &[&str] = &["display", "visibility", "opacity"];

/// Value used in index columns for "nothing here".
const NO_INDEX: i64 = -1;

/// Errors raised while decoding a snapshot. All of them mean the snapshot is malformed.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum SnapshotError {
    /// snapshot JSON could not be read: {message}
    Json { message: String },

    /// document {index} requested but the snapshot holds {count}
    DocumentOutOfRange { index: usize, count: usize },

    /// column `{column}` has {found} entries, expected {expected}
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    /// string index {index} is outside the string table ({len} entries)
    StringOutOfRange { index: i64, len: usize },

    /// node {row} has parent index {parent}, outside the node table ({len} rows)
    ParentOutOfRange { row: usize, parent: i64, len: usize },

    /// node {row} is part of a parent cycle
    ParentCycle { row: usize },

    /// node {row} sits under node {parent}, which cannot have children
    ParentNotElement { row: usize, parent: usize },

    /// node {row} has unknown node type {node_type}
    UnknownNodeType { row: usize, node_type: i64 },

    /// node {row} has an odd-length attribute list
    OddAttributes { row: usize },

    /// layout entry {entry} refers to node {node}, outside the node table ({len} rows)
    LayoutNodeOutOfRange { entry: usize, node: i64, len: usize },

    /// layout entry {entry} has unusable geometry ({len} values)
    BadGeometry { entry: usize, len: usize },

    /// layout entry {entry} has {len} style values but {expected} properties were requested
    StyleRowTooLong {
        entry: usize,
        len: usize,
        expected: usize,
    },
}

/// Result of `DOMSnapshot.captureSnapshot`.
#[derive(Facet, Debug, Clone, Default)]
#[facet(rename_all = "camelCase")]
pub struct CaptureSnapshot {
    /// One entry per captured document (the main frame first)
    #[facet(default)]
    pub documents: Vec<DocumentSnapshot>,

    /// Shared string table referenced by index from every other table
    #[facet(default)]
    pub strings: Vec<String>,
}

impl CaptureSnapshot {
    /// Read a snapshot from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        facet_json::from_str::<CaptureSnapshot>(json).map_err(|err| SnapshotError::Json {
            message: err.to_string(),
        })
    }
}

/// One captured document.
#[derive(Facet, Debug, Clone, Default)]
#[facet(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub nodes: NodeTreeSnapshot,

    #[facet(default)]
    pub layout: LayoutTreeSnapshot,
}

/// Node table, one entry per row in each column.
///
/// `parent_index`, `node_type` and `node_name` are required; the other
/// columns may be left empty.
#[derive(Facet, Debug, Clone, Default)]
#[facet(rename_all = "camelCase")]
pub struct NodeTreeSnapshot {
    /// Parent row, or -1 for a root
    #[facet(default)]
    pub parent_index: Vec<i64>,

    /// DOM node type (1 element, 3 text, 9 document, ...)
    #[facet(default)]
    pub node_type: Vec<i64>,

    /// String index of the node name (tag for elements)
    #[facet(default)]
    pub node_name: Vec<i64>,

    /// String index of the node value (text content), or -1
    #[facet(default)]
    pub node_value: Vec<i64>,

    /// Opaque backend identifier, copied into metadata
    #[facet(default)]
    pub backend_node_id: Vec<i64>,

    /// Flattened `[name, value, name, value, ...]` string indices
    #[facet(default)]
    pub attributes: Vec<Vec<i64>>,
}

/// Layout table: a sparse subset of node rows with geometry and styles.
#[derive(Facet, Debug, Clone, Default)]
#[facet(rename_all = "camelCase")]
pub struct LayoutTreeSnapshot {
    /// Node row described by each entry
    #[facet(default)]
    pub node_index: Vec<i64>,

    /// Per entry: string index of the value of each requested computed style, or -1
    #[facet(default)]
    pub styles: Vec<Vec<i64>>,

    /// Per entry: `[x, y, width, height]` or an 8-number quad
    #[facet(default)]
    pub bounds: Vec<Vec<f64>>,
}

/// How a node row maps onto the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Element,
    Text,
    /// Document or fragment: transparent, its children are lifted to its parent
    Container,
    /// Comments, doctypes, processing instructions: dropped
    Skipped,
}

impl RowKind {
    fn from_node_type(row: usize, node_type: i64) -> Result<Self, SnapshotError> {
        match node_type {
            1 => Ok(RowKind::Element),
            3 | 4 => Ok(RowKind::Text),
            9 | 11 => Ok(RowKind::Container),
            7 | 8 | 10 => Ok(RowKind::Skipped),
            _ => Err(SnapshotError::UnknownNodeType { row, node_type }),
        }
    }
}

/// Borrowed string table with checked lookups.
struct StringTable<'a>(&'a [String]);

impl<'a> StringTable<'a> {
    fn get(&self, index: i64) -> Result<&'a str, SnapshotError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.0.get(i))
            .map(String::as_str)
            .ok_or(SnapshotError::StringOutOfRange {
                index,
                len: self.0.len(),
            })
    }
}

/// Snapshot decoder configuration.
#[derive(Debug, Clone)]
pub struct SnapshotDecoder {
    /// Computed style names, in the order they were requested from the browser
    computed_styles: Vec<CompactString>,

    /// Which captured document to decode
    document: usize,
}

impl Default for SnapshotDecoder {
    fn default() -> Self {
        SnapshotDecoder {
            computed_styles: DEFAULT_COMPUTED_STYLES
                .iter()
                .map(|&s| CompactString::from(s))
                .collect(),
            document: 0,
        }
    }
}

impl SnapshotDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the computed style names, in the order passed to `captureSnapshot`.
    pub fn with_computed_styles<I, S>(mut self, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.computed_styles = styles
            .into_iter()
            .map(|s| CompactString::from(s.as_ref()))
            .collect();
        self
    }

    /// Decode the document at `index` instead of the main frame.
    pub fn with_document(mut self, index: usize) -> Self {
        self.document = index;
        self
    }

    pub fn computed_styles(&self) -> &[CompactString] {
        &self.computed_styles
    }

    /// Decode the selected document. A snapshot without documents yields an
    /// empty `html` root.
    pub fn decode(&self, snapshot: &CaptureSnapshot) -> Result<Document, SnapshotError> {
        if snapshot.documents.is_empty() {
            debug!("snapshot holds no documents");
            return Ok(Document::new(ElementData::new("html")));
        }
        let document =
            snapshot
                .documents
                .get(self.document)
                .ok_or(SnapshotError::DocumentOutOfRange {
                    index: self.document,
                    count: snapshot.documents.len(),
                })?;
        self.decode_document(document, &snapshot.strings)
    }

    /// Parse snapshot JSON and decode it.
    pub fn decode_json(&self, json: &str) -> Result<Document, SnapshotError> {
        self.decode(&CaptureSnapshot::from_json(json)?)
    }

    /// Decode one document against a string table.
    pub fn decode_document(
        &self,
        document: &DocumentSnapshot,
        strings: &[String],
    ) -> Result<Document, SnapshotError> {
        let strings = StringTable(strings);
        let nodes = &document.nodes;
        let rows = nodes.parent_index.len();
        debug!(
            "decoding snapshot: {} rows, {} layout entries, {} strings",
            rows,
            document.layout.node_index.len(),
            strings.0.len()
        );

        check_column("nodeType", rows, nodes.node_type.len(), false)?;
        check_column("nodeName", rows, nodes.node_name.len(), false)?;
        check_column("nodeValue", rows, nodes.node_value.len(), true)?;
        check_column("backendNodeId", rows, nodes.backend_node_id.len(), true)?;
        check_column("attributes", rows, nodes.attributes.len(), true)?;

        let parents = resolve_parents(&nodes.parent_index)?;
        check_acyclic(&parents)?;

        // Pass 1: one node per row
        let mut arena = Arena::with_capacity(rows + 1);
        let mut kinds = Vec::with_capacity(rows);
        let mut ids: Vec<Option<NodeId>> = Vec::with_capacity(rows);
        for (row, &node_type) in nodes.node_type.iter().enumerate() {
            let kind = RowKind::from_node_type(row, node_type)?;
            let id = match kind {
                RowKind::Element => {
                    let elem = element_row(row, nodes, &strings)?;
                    Some(arena.new_node(NodeData::Element(elem)))
                }
                RowKind::Text => {
                    let text = text_row(row, nodes, &strings)?;
                    Some(arena.new_node(NodeData::Text(text.into())))
                }
                RowKind::Container | RowKind::Skipped => None,
            };
            kinds.push(kind);
            ids.push(id);
        }

        // Pass 2: edges, in row order so siblings keep their order
        let mut top_level = Vec::new();
        for (row, id) in ids.iter().enumerate() {
            let Some(id) = *id else {
                continue;
            };
            let mut parent = parents[row];
            while let Some(p) = parent
                && kinds[p] == RowKind::Container
            {
                parent = parents[p];
            }
            match parent {
                None => top_level.push(id),
                Some(p) => match (kinds[p], ids[p]) {
                    (RowKind::Element, Some(parent_id)) => parent_id.append(id, &mut arena),
                    _ => return Err(SnapshotError::ParentNotElement { row, parent: p }),
                },
            }
        }

        let single_root = match top_level[..] {
            [only] => Some(only),
            _ => None,
        }
        .filter(|&id| matches!(arena[id].get(), NodeData::Element(_)));
        let root = match single_root {
            Some(root) => root,
            None => {
                debug!(
                    "synthesizing a root over {} top-level nodes",
                    top_level.len()
                );
                let root = arena.new_node(NodeData::Element(ElementData::new("html")));
                for id in top_level {
                    root.append(id, &mut arena);
                }
                root
            }
        };

        // Pass 3: layout
        let layout = &document.layout;
        let entries = layout.node_index.len();
        check_column("layout.bounds", entries, layout.bounds.len(), true)?;
        check_column("layout.styles", entries, layout.styles.len(), true)?;
        for (entry, &node) in layout.node_index.iter().enumerate() {
            let row = usize::try_from(node)
                .ok()
                .filter(|&row| row < rows)
                .ok_or(SnapshotError::LayoutNodeOutOfRange {
                    entry,
                    node,
                    len: rows,
                })?;
            let Some(id) = ids[row] else {
                continue;
            };
            let Some(elem) = arena[id].get_mut().as_element_mut() else {
                trace!("layout entry {} describes text row {}, skipped", entry, row);
                continue;
            };
            if let Some(geometry) = layout.bounds.get(entry) {
                elem.bounds = Some(decode_geometry(entry, geometry)?);
            }
            if let Some(values) = layout.styles.get(entry) {
                self.decode_styles(entry, values, &strings, &mut elem.styles)?;
            }
        }

        Ok(Document { arena, root })
    }

    /// Zip the requested style names with one row of value indices.
    fn decode_styles(
        &self,
        entry: usize,
        values: &[i64],
        strings: &StringTable<'_>,
        styles: &mut Styles,
    ) -> Result<(), SnapshotError> {
        if values.len() > self.computed_styles.len() {
            return Err(SnapshotError::StyleRowTooLong {
                entry,
                len: values.len(),
                expected: self.computed_styles.len(),
            });
        }
        for (property, &index) in self.computed_styles.iter().zip(values) {
            if index == NO_INDEX {
                continue;
            }
            styles.insert(property.clone(), strings.get(index)?.into());
        }
        Ok(())
    }
}

/// Decode the main document of `snapshot` with the given computed style names.
pub fn decode_snapshot<S: AsRef<str>>(
    snapshot: &CaptureSnapshot,
    computed_styles: &[S],
) -> Result<Document, SnapshotError> {
    SnapshotDecoder::new()
        .with_computed_styles(computed_styles)
        .decode(snapshot)
}

fn check_column(
    column: &str,
    expected: usize,
    found: usize,
    optional: bool,
) -> Result<(), SnapshotError> {
    if found == expected || (optional && found == 0) {
        return Ok(());
    }
    Err(SnapshotError::ColumnLength {
        column: column.to_string(),
        expected,
        found,
    })
}

fn resolve_parents(parent_index: &[i64]) -> Result<Vec<Option<usize>>, SnapshotError> {
    let len = parent_index.len();
    parent_index
        .iter()
        .enumerate()
        .map(|(row, &parent)| {
            if parent == NO_INDEX {
                return Ok(None);
            }
            usize::try_from(parent)
                .ok()
                .filter(|&p| p < len)
                .map(Some)
                .ok_or(SnapshotError::ParentOutOfRange { row, parent, len })
        })
        .collect()
}

fn check_acyclic(parents: &[Option<usize>]) -> Result<(), SnapshotError> {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; parents.len()];
    let mut path = Vec::new();
    for start in 0..parents.len() {
        let mut cursor = Some(start);
        while let Some(row) = cursor {
            match state[row] {
                DONE => break,
                ON_PATH => return Err(SnapshotError::ParentCycle { row }),
                _ => {
                    state[row] = ON_PATH;
                    path.push(row);
                    cursor = parents[row];
                }
            }
        }
        for row in path.drain(..) {
            state[row] = DONE;
        }
    }
    Ok(())
}

fn element_row(
    row: usize,
    nodes: &NodeTreeSnapshot,
    strings: &StringTable<'_>,
) -> Result<ElementData, SnapshotError> {
    let mut elem = ElementData::new(strings.get(nodes.node_name[row])?);

    if let Some(pairs) = nodes.attributes.get(row) {
        if pairs.len() % 2 != 0 {
            return Err(SnapshotError::OddAttributes { row });
        }
        for pair in pairs.chunks_exact(2) {
            let name = strings.get(pair[0])?;
            let value = strings.get(pair[1])?;
            elem.attrs.insert(name.into(), value.into());
        }
    }

    let backend_id = nodes
        .backend_node_id
        .get(row)
        .copied()
        .unwrap_or(row as i64);
    elem.metadata
        .insert("backend_node_id".into(), MetaValue::Int(backend_id));
    elem.metadata
        .insert("cdp_index".into(), MetaValue::Int(row as i64));
    Ok(elem)
}

/// Text rows carry their content in the value column, or in the name slot when
/// there is no value.
fn text_row<'a>(
    row: usize,
    nodes: &NodeTreeSnapshot,
    strings: &StringTable<'a>,
) -> Result<&'a str, SnapshotError> {
    let index = nodes
        .node_value
        .get(row)
        .copied()
        .filter(|&v| v != NO_INDEX)
        .unwrap_or(nodes.node_name[row]);
    strings.get(index)
}

fn decode_geometry(entry: usize, geometry: &[f64]) -> Result<BoundingBox, SnapshotError> {
    let bounds = match geometry.len() {
        4 => BoundingBox::from_rect(geometry),
        8 => BoundingBox::from_quad(geometry),
        _ => None,
    };
    bounds.ok_or(SnapshotError::BadGeometry {
        entry,
        len: geometry.len(),
    })
}
