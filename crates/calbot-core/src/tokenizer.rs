//! Pull tokenizer over hand-authored HTML with one token of lookahead.
//!
//! [`TokenReader`] wraps a lenient `quick-xml` reader and flattens its events
//! into the small [`Token`] vocabulary the parser understands. Markup the
//! parser never looks at (comments, doctypes, processing instructions) is
//! dropped here, adjacent text runs are merged, and the bodies of `<script>`
//! and `<style>` elements are read verbatim so their contents are never
//! mistaken for markup.

use std::collections::VecDeque;
use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};
use tracing::trace;

use crate::error::{ExtractError, ExtractResult};

/// A tag with its lowercase name and attributes in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    /// Returns the value of an attribute.
    ///
    /// When the attribute is repeated, the last occurrence wins.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag(Tag),
    /// A tag written as `<br/>`.
    SelfClosingTag(Tag),
    EndTag(String),
    Text(String),
    /// End of input. Returned again on every read once reached.
    Eof,
}

/// Streaming token source with a one-slot lookahead buffer.
pub struct TokenReader<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    /// Tokens decoded from the stream but not handed out yet. Adjacent text
    /// is merged as it arrives.
    pending: VecDeque<Token>,
    /// The lookahead slot filled by [`TokenReader::peek`].
    peeked: Option<Token>,
    finished: bool,
}

impl<R: BufRead> TokenReader<R> {
    /// Creates a token reader over an HTML document.
    pub fn new(source: R) -> Self {
        Self {
            reader: lenient_reader(source),
            buf: Vec::new(),
            pending: VecDeque::new(),
            peeked: None,
            finished: false,
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> ExtractResult<&Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.advance()?,
        };
        Ok(self.peeked.insert(token))
    }

    /// Consumes and returns the next token.
    pub fn next_token(&mut self) -> ExtractResult<Token> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.advance(),
        }
    }

    /// Byte offset of the underlying reader.
    pub fn position(&self) -> u64 {
        self.reader.buffer_position()
    }

    fn advance(&mut self) -> ExtractResult<Token> {
        while !self.front_is_complete() && !self.finished {
            self.read_event()?;
        }
        Ok(self.pending.pop_front().unwrap_or(Token::Eof))
    }

    /// A text run is only complete once something else follows it.
    fn front_is_complete(&self) -> bool {
        match self.pending.len() {
            0 => false,
            1 => !matches!(self.pending[0], Token::Text(_)),
            _ => true,
        }
    }

    fn read_event(&mut self) -> ExtractResult<()> {
        self.buf.clear();
        let lexed = match self.reader.read_event_into(&mut self.buf) {
            Ok(event) => lex(event),
            Err(source) => {
                return Err(ExtractError::malformed(
                    self.reader.buffer_position(),
                    source,
                ));
            }
        };

        match lexed {
            Lexed::Text(text) => self.push_text(&text),
            Lexed::Token(token) => {
                let raw_element = match &token {
                    Token::StartTag(tag) if is_raw_text_element(&tag.name) => {
                        Some(tag.name.clone())
                    }
                    _ => None,
                };
                self.pending.push_back(token);
                if let Some(name) = raw_element {
                    self.read_raw_text(&name)?;
                }
            }
            Lexed::Stray(swallowed) => {
                self.push_text("<");
                self.relex(&swallowed)?;
            }
            Lexed::Eof => self.finished = true,
            Lexed::Skip => {}
        }
        Ok(())
    }

    /// Lexes bytes that were read as a tag but started with a literal `<`.
    fn relex(&mut self, fragment: &[u8]) -> ExtractResult<()> {
        trace!(bytes = fragment.len(), "Re-reading stray '<' as text");
        let mut reader = lenient_reader(fragment);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(source) => return Err(ExtractError::malformed(self.position(), source)),
            };
            match lex(event) {
                Lexed::Text(text) => self.push_text(&text),
                Lexed::Token(token) => self.pending.push_back(token),
                Lexed::Stray(inner) => {
                    self.push_text("<");
                    self.relex(&inner)?;
                }
                Lexed::Eof => return Ok(()),
                Lexed::Skip => {}
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.pending.back_mut() {
            Some(Token::Text(run)) => run.push_str(text),
            _ => self.pending.push_back(Token::Text(text.to_string())),
        }
    }

    /// Reads the body of a `<script>` or `<style>` element straight from the
    /// stream, up to and including its closing tag.
    fn read_raw_text(&mut self, name: &str) -> ExtractResult<()> {
        let mut raw = Vec::new();
        loop {
            let read = match self.reader.get_mut().read_until(b'>', &mut raw) {
                Ok(read) => read,
                Err(err) => return Err(ExtractError::malformed(self.position(), err)),
            };

            if read == 0 {
                // Unterminated element: the rest of the document is its body.
                self.push_text(&String::from_utf8_lossy(&raw));
                return Ok(());
            }

            if let Some(start) = closing_tag_start(&raw, name) {
                raw.truncate(start);
                trace!(element = name, bytes = raw.len(), "Read raw text element");
                self.push_text(&String::from_utf8_lossy(&raw));
                self.pending.push_back(Token::EndTag(name.to_string()));
                return Ok(());
            }
        }
    }
}

/// One reader event, detached from the read buffer.
enum Lexed {
    Text(String),
    Token(Token),
    /// A `<` that does not open a tag, with everything the reader consumed
    /// after it up to and including the `>`.
    Stray(Vec<u8>),
    Eof,
    /// Comments, doctypes and processing instructions.
    Skip,
}

fn lenient_reader<R>(source: R) -> Reader<R> {
    let mut reader = Reader::from_reader(source);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.check_comments = false;
    config.trim_text(false);
    reader
}

fn lex(event: Event<'_>) -> Lexed {
    match event {
        Event::Text(e) => Lexed::Text(decode_references(&String::from_utf8_lossy(&e))),
        Event::CData(e) => Lexed::Text(String::from_utf8_lossy(&e).into_owned()),
        Event::Start(e) => start_tag(&e, false),
        Event::Empty(e) => start_tag(&e, true),
        Event::End(e) => Lexed::Token(Token::EndTag(lowercase_name(e.name().as_ref()))),
        Event::Eof => Lexed::Eof,
        Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => Lexed::Skip,
    }
}

/// Builds a start tag token. `slash` is set when the tag ended in `/>`.
fn start_tag(start: &BytesStart<'_>, slash: bool) -> Lexed {
    let content: &[u8] = start;

    // HTML only opens a tag when `<` is followed by a letter.
    if !content.first().is_some_and(u8::is_ascii_alphabetic) {
        let mut swallowed = content.to_vec();
        swallowed.extend_from_slice(if slash { b"/>" } else { b">" });
        return Lexed::Stray(swallowed);
    }

    let mut tag = tag_from(start);
    if !slash {
        return Lexed::Token(Token::StartTag(tag));
    }
    // `<a href=/path/>`: the slash is part of the unquoted value.
    if ends_in_unquoted_value(content) {
        if let Some((_, value)) = tag.attrs.last_mut() {
            value.push('/');
        }
        return Lexed::Token(Token::StartTag(tag));
    }
    Lexed::Token(Token::SelfClosingTag(tag))
}

fn tag_from(start: &BytesStart<'_>) -> Tag {
    let mut attributes = start.html_attributes();
    attributes.with_checks(false);

    let attrs = attributes
        .filter_map(Result::ok)
        .map(|attr| {
            let key = lowercase_name(attr.key.as_ref());
            let value = decode_references(&String::from_utf8_lossy(&attr.value));
            (key, value)
        })
        .collect();

    Tag {
        name: lowercase_name(start.name().as_ref()),
        attrs,
    }
}

/// Whether tag content (name and attributes) stops inside an unquoted
/// attribute value, or right after its `=`.
fn ends_in_unquoted_value(content: &[u8]) -> bool {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum At {
        TagName,
        Between,
        Key,
        AfterKey,
        BeforeValue,
        Quoted(u8),
        Unquoted,
    }

    let mut at = At::TagName;
    for &byte in content {
        let space = byte.is_ascii_whitespace();
        at = match at {
            At::TagName if space => At::Between,
            At::TagName => At::TagName,
            At::Between if space => At::Between,
            At::Between => At::Key,
            At::Key | At::AfterKey if byte == b'=' => At::BeforeValue,
            At::Key | At::AfterKey if space => At::AfterKey,
            At::Key => At::Key,
            At::AfterKey => At::Key,
            At::BeforeValue if space => At::BeforeValue,
            At::BeforeValue if byte == b'"' || byte == b'\'' => At::Quoted(byte),
            At::BeforeValue => At::Unquoted,
            At::Quoted(quote) if byte == quote => At::Between,
            At::Quoted(quote) => At::Quoted(quote),
            At::Unquoted if space => At::Between,
            At::Unquoted => At::Unquoted,
        };
    }
    matches!(at, At::BeforeValue | At::Unquoted)
}

/// Longest named reference in the HTML5 table, with room to spare.
const MAX_REFERENCE_LEN: usize = 32;

/// Replaces character references one at a time. An `&` that does not start a
/// known reference is kept literally.
fn decode_references(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp + 1..];

        let resolved = rest
            .find(';')
            .filter(|&semi| semi <= MAX_REFERENCE_LEN)
            .and_then(|semi| Some((semi, resolve_reference(&rest[..semi])?)));
        match resolved {
            Some((semi, text)) => {
                out.push_str(&text);
                rest = &rest[semi + 1..];
            }
            None => out.push('&'),
        }
    }
    out.push_str(rest);
    out
}

fn resolve_reference(name: &str) -> Option<String> {
    let Some(number) = name.strip_prefix('#') else {
        return resolve_html5_entity(name).map(str::to_string);
    };
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse().ok()?,
    };
    char::from_u32(code).map(String::from)
}

fn lowercase_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_ascii_lowercase()
}

fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style")
}

/// If `raw` ends with `</name>` (any case, optional whitespace before `>`),
/// returns the offset where that closing tag starts.
fn closing_tag_start(raw: &[u8], name: &str) -> Option<usize> {
    let start = raw.windows(2).rposition(|pair| pair == b"</")?;
    let tail = raw[start + 2..].strip_suffix(b">")?.trim_ascii_end();
    tail.eq_ignore_ascii_case(name.as_bytes()).then_some(start)
}
