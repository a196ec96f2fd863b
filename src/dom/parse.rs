//! HTML tokenization into the arena

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use super::{Document, NodeData, NodeId};

/// Elements that never have children or an end tag
pub(crate) const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub(crate) fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Builds the tree from tokens with a plain open-element stack.
///
/// An end tag closes the nearest open element with the same name (and
/// everything opened after it); stray end tags are ignored.
struct TreeSink {
    doc: Document,
    open: Vec<NodeId>,
}

impl TreeSink {
    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.doc.root())
    }

    fn append_text(&mut self, text: &str) {
        let parent = self.current();
        if let Some(last) = self.doc.children(parent).last().copied() {
            if let NodeData::Text(existing) = &mut self.doc.node_mut(last).data {
                existing.push_str(text);
                return;
            }
        }
        let node = self.doc.create_text(text);
        self.doc.append_child(parent, node);
    }
}

impl TokenSink for TreeSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => {
                    let name = tag.name.to_string();
                    let attrs: Vec<(String, String)> = tag
                        .attrs
                        .iter()
                        .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                        .collect();
                    let element = self.doc.push(NodeData::Element {
                        name: name.clone(),
                        attrs,
                    });
                    let parent = self.current();
                    self.doc.append_child(parent, element);

                    if tag.self_closing || is_void(&name) {
                        return TokenSinkResult::Continue;
                    }
                    self.open.push(element);
                    return match name.as_str() {
                        "script" => TokenSinkResult::RawData(RawKind::ScriptData),
                        "style" | "xmp" | "iframe" | "noembed" | "noframes" => {
                            TokenSinkResult::RawData(RawKind::Rawtext)
                        }
                        "title" | "textarea" => TokenSinkResult::RawData(RawKind::Rcdata),
                        _ => TokenSinkResult::Continue,
                    };
                }
                TagKind::EndTag => {
                    let name = tag.name.to_string();
                    if let Some(pos) = self
                        .open
                        .iter()
                        .rposition(|id| self.doc.tag_name(*id) == Some(name.as_str()))
                    {
                        self.open.truncate(pos);
                    }
                }
            },
            Token::CharacterTokens(text) => self.append_text(&text),
            Token::CommentToken(text) => {
                let parent = self.current();
                let node = self.doc.create_comment(&text);
                self.doc.append_child(parent, node);
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl Document {
    /// Parse markup leniently; malformed input never fails
    pub fn parse(html: &str) -> Self {
        let sink = TreeSink {
            doc: Document::new(),
            open: Vec::new(),
        };
        let mut tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
        let mut input = BufferQueue::default();
        input.push_back(StrTendril::from_slice(html));
        let _ = tokenizer.feed(&mut input);
        tokenizer.end();
        tokenizer.sink.doc
    }
}
