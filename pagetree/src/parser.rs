//! Markup tokenization using html5ever's tokenizer.
//!
//! html5ever does the character-level work; its tokens are translated into
//! [`MarkupEvent`]s and handed to the [`TreeBuilder`](crate::builder::TreeBuilder).
//! Tree construction stays ours, so the result keeps the source structure
//! instead of the `html`/`head`/`body` fix-ups of HTML5 tree construction.

use std::cell::RefCell;

use compact_str::CompactString;
use html5ever::TokenizerResult;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use crate::builder::{BuilderOptions, MarkupEvent, build_with};
use crate::dom::Document;
use crate::trace;

/// TokenSink that records markup events
#[derive(Default)]
struct EventSink {
    events: RefCell<Vec<MarkupEvent>>,
}

impl EventSink {
    fn push(&self, event: MarkupEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl TokenSink for EventSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => {
                let name = CompactString::from(tag.name.as_ref());
                match tag.kind {
                    TagKind::StartTag => {
                        let attrs = tag
                            .attrs
                            .into_iter()
                            .map(|attr| {
                                (
                                    CompactString::from(attr.name.local.as_ref()),
                                    CompactString::from(attr.value.as_ref()),
                                )
                            })
                            .collect();
                        let raw = raw_kind_for(&name);
                        let self_closing = tag.self_closing;
                        self.push(MarkupEvent::StartTag {
                            name,
                            attrs,
                            self_closing,
                        });
                        // Switch the tokenizer the way a tree builder would, so the
                        // contents of script/style/textarea come through as text.
                        if !self_closing && let Some(result) = raw {
                            return result;
                        }
                    }
                    TagKind::EndTag => self.push(MarkupEvent::EndTag { name }),
                }
            }
            Token::CharacterTokens(text) => {
                self.push(MarkupEvent::Text(CompactString::from(text.as_ref())));
            }
            Token::CommentToken(text) => {
                self.push(MarkupEvent::Comment(CompactString::from(text.as_ref())));
            }
            Token::ParseError(_msg) => {
                trace!("tokenizer recovered from: {}", _msg);
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

fn raw_kind_for(tag: &str) -> Option<TokenSinkResult<()>> {
    match tag {
        "script" => Some(TokenSinkResult::RawData(RawKind::ScriptData)),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => {
            Some(TokenSinkResult::RawData(RawKind::Rawtext))
        }
        "textarea" | "title" => Some(TokenSinkResult::RawData(RawKind::Rcdata)),
        "plaintext" => Some(TokenSinkResult::Plaintext),
        _ => None,
    }
}

/// Tokenize a markup string into the event stream consumed by the builder.
pub fn tokenize(markup: &str) -> Vec<MarkupEvent> {
    let tokenizer = Tokenizer::new(EventSink::default(), TokenizerOpts::default());
    let input = BufferQueue::default();
    input.push_back(StrTendril::from(markup));
    while !matches!(tokenizer.feed(&input), TokenizerResult::Done) {}
    tokenizer.end();
    tokenizer.sink.events.take()
}

/// Parse a markup string (optionally annotated with rendering data) into a tree.
///
/// Annotation attributes are lifted: see [`BuilderOptions::lift_annotations`].
///
/// # Example
///
/// ```rust
/// let doc = pagetree::parse_html(r#"<div><button role="button">Click</button></div>"#);
/// assert_eq!(doc.root_element().unwrap().tag, "div");
/// assert_eq!(doc.get_text(doc.root, ""), "Click");
/// ```
pub fn parse_html(markup: &str) -> Document {
    build_with(tokenize(markup), &BuilderOptions::annotated())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{BoundingBox, MetaValue};
    use facet_testhelpers::test;

    #[test]
    fn test_tokenize_events() {
        let events = tokenize(r#"<div class="a"><br/>hi<!-- note --></div>"#);
        assert_eq!(
            events,
            vec![
                MarkupEvent::start("div", &[("class", "a")]),
                MarkupEvent::self_closing("br", &[]),
                MarkupEvent::text("hi"),
                MarkupEvent::Comment(" note ".into()),
                MarkupEvent::end("div"),
            ]
        );
    }

    #[test]
    fn test_script_content_is_text() {
        let doc = parse_html("<div><script>if (a < b) { x('<p>') }</script></div>");
        let script = doc.children(doc.root).next().unwrap();
        assert_eq!(doc.element(script).unwrap().tag, "script");
        assert_eq!(doc.child_count(script), 1);
        assert_eq!(doc.get_text(script, ""), "if (a < b) { x('<p>') }");
    }

    #[test]
    fn test_parse_simple() {
        let doc = parse_html("<div>Hello</div>");
        assert_eq!(doc.root_element().unwrap().tag, "div");
        let text = doc.children(doc.root).next().unwrap();
        assert_eq!(doc.text(text), Some("Hello"));
    }

    #[test]
    fn test_parse_mixed_content() {
        let doc = parse_html("<div>Hello <span>world</span>!</div>");
        let kids: Vec<_> = doc.children(doc.root).collect();
        assert_eq!(kids.len(), 3);
        assert_eq!(doc.text(kids[0]), Some("Hello "));
        assert_eq!(doc.element(kids[1]).unwrap().tag, "span");
        assert_eq!(doc.text(kids[2]), Some("!"));
    }

    #[test]
    fn test_parse_annotated_dump() {
        let doc = parse_html(
            r#"<div backend_node_id="7" bounding_box_rect="1,2,3,4"><text>Content</text></div>"#,
        );
        let root = doc.root_element().unwrap();
        assert_eq!(root.metadata.get("backend_node_id"), Some(&MetaValue::Int(7)));
        assert_eq!(root.bounds, Some(BoundingBox::new(1.0, 2.0, 3.0, 4.0)));
        let child = doc.children(doc.root).next().unwrap();
        assert_eq!(doc.element(child).unwrap().tag, "span");
    }

    #[test]
    fn test_parse_empty_and_whitespace() {
        for markup in ["", "   ", "\n\t"] {
            let doc = parse_html(markup);
            assert_eq!(doc.root_element().unwrap().tag, "html");
            assert_eq!(doc.child_count(doc.root), 0);
        }
    }

    #[test]
    fn test_parse_uppercase_tags() {
        let doc = parse_html("<DIV><P>x</P></DIV>");
        assert_eq!(doc.root_element().unwrap().tag, "div");
        let p = doc.children(doc.root).next().unwrap();
        assert_eq!(doc.element(p).unwrap().tag, "p");
    }
}
