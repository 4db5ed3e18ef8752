use pagetree::{
    BoundingBox, Document, ElementData, MarkupEvent, NodeData, TreeError, build, parse_html,
};

#[test]
fn test_event_stream_round_trip() {
    let doc = build([
        MarkupEvent::start("div", &[]),
        MarkupEvent::start("button", &[("role", "button")]),
        MarkupEvent::text("Click"),
        MarkupEvent::end("button"),
        MarkupEvent::end("div"),
    ]);

    let root = doc.root_element().unwrap();
    assert_eq!(root.tag, "div");
    let children: Vec<_> = doc.children(doc.root).collect();
    assert_eq!(children.len(), 1);

    let button = doc.element(children[0]).unwrap();
    assert_eq!(button.tag, "button");
    assert_eq!(button.attrs.len(), 1);
    assert_eq!(button.attr("role"), Some("button"));
    assert_eq!(doc.get_text(doc.root, ""), "Click");
}

#[test]
fn test_markup_and_events_agree() {
    let from_markup = parse_html(r#"<div><button role="button">Click</button></div>"#);
    let from_events = build([
        MarkupEvent::start("div", &[]),
        MarkupEvent::start("button", &[("role", "button")]),
        MarkupEvent::text("Click"),
        MarkupEvent::end("button"),
        MarkupEvent::end("div"),
    ]);
    assert_eq!(from_markup, from_events);
}

#[test]
fn test_programmatic_construction() {
    let mut doc = Document::new(
        ElementData::new("main")
            .with_attr("role", "main")
            .with_bounds(BoundingBox::new(0.0, 0.0, 1280.0, 720.0)),
    );
    let root = doc.root;
    let list = doc.append_element(root, ElementData::new("ul")).unwrap();
    for label in ["one", "two", "three"] {
        let item = doc.append_element(list, ElementData::new("li")).unwrap();
        doc.append_text(item, label).unwrap();
    }

    assert_eq!(doc.child_count(list), 3);
    assert_eq!(doc.get_text(root, " / "), "one / two / three");
    assert_eq!(doc.node_count(), 8);

    // move the last item to the front by re-appending the others after it
    let items: Vec<_> = doc.children(list).collect();
    doc.append(list, items[0]).unwrap();
    doc.append(list, items[1]).unwrap();
    assert_eq!(doc.get_text(root, " "), "three one two");
}

#[test]
fn test_invalid_operations() {
    let mut doc = Document::new(ElementData::new("div"));
    let root = doc.root;
    let section = doc.append_element(root, ElementData::new("section")).unwrap();
    let text = doc.append_text(section, "leaf").unwrap();
    let stray = doc.new_element(ElementData::new("p"));

    assert_eq!(doc.append(text, stray), Err(TreeError::TextParent));
    assert_eq!(doc.append(section, root), Err(TreeError::RootNotMovable));
    assert_eq!(doc.append(section, section), Err(TreeError::Cycle));
    assert_eq!(doc.remove(root, stray), Err(TreeError::NotFound));
    assert_eq!(doc.remove(root, text), Err(TreeError::NotFound));

    // nothing changed
    assert_eq!(doc.node_count(), 3);
    assert!(matches!(doc.get(text), NodeData::Text(t) if t == "leaf"));
}

#[test]
fn test_visibility_and_geometry_queries() {
    let mut doc = Document::new(ElementData::new("div"));
    let root = doc.root;
    let faded = doc
        .append_element(root, ElementData::new("span").with_style("opacity", "0.005"))
        .unwrap();
    let flat = doc
        .append_element(
            root,
            ElementData::new("hr").with_bounds(BoundingBox::new(0.0, 0.0, 300.0, 0.0)),
        )
        .unwrap();
    let text = doc.append_text(root, "always visible").unwrap();

    assert!(!doc.is_visible(faded));
    assert!(!doc.has_zero_size(faded));
    assert!(doc.is_visible(flat));
    assert!(doc.has_zero_size(flat));
    assert!(doc.is_visible(text));
    assert!(!doc.has_zero_size(text));
}

#[test]
fn test_documents_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Document>();
    assert_send_sync::<pagetree::Pipeline>();
}
