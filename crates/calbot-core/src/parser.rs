//! State machine that turns guide markup into draft events.
//!
//! The parser walks the token stream looking for date headings (`<h1>` to
//! `<h5>` whose text reads like `Friday, May 10`). Every paragraph under a
//! recognized heading becomes one [`DraftEvent`] seeded with that heading's
//! dates. Inside a paragraph, the first bold run is the title, call-to-action
//! anchors become the event link, and everything else is collected as body
//! text.
//!
//! Each state is a method that consumes tokens until it knows the next state;
//! [`Parser::run`] dispatches on the returned [`State`] until end of input.

use std::io::BufRead;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::event::DraftEvent;
use crate::patterns::{DateHeader, PatternTable, weekday_offset};
use crate::time::DateRange;
use crate::tokenizer::{Token, TokenReader};

/// Receiver of draft events, in document order.
pub trait EventSink {
    /// Hands a sealed draft downstream. The parser never touches it again.
    fn emit(&mut self, draft: DraftEvent) -> ExtractResult<()>;
}

impl EventSink for Vec<DraftEvent> {
    fn emit(&mut self, draft: DraftEvent) -> ExtractResult<()> {
        self.push(draft);
        Ok(())
    }
}

/// Blocks until the next stage takes the draft.
///
/// Must be called from a blocking context (see [`crate::pipeline`]).
impl EventSink for mpsc::Sender<DraftEvent> {
    fn emit(&mut self, draft: DraftEvent) -> ExtractResult<()> {
        self.blocking_send(draft)
            .map_err(|_| ExtractError::PipelineClosed)
    }
}

/// Where to go once an ignored element has been skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Section,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Outside any dated section.
    Root,
    /// Inside a heading, collecting its text.
    Header,
    /// Between a date heading and the next heading.
    Section,
    /// Inside a paragraph with a draft in progress.
    Paragraph,
    Link,
    Bold,
    /// Skipping a `<script>` or `<style>` body.
    Ignore(Scope),
    Done,
}

impl From<Scope> for State {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Root => Self::Root,
            Scope::Section => Self::Section,
        }
    }
}

/// Guide parser over one document.
pub struct Parser<R> {
    tokens: TokenReader<R>,
    patterns: Arc<PatternTable>,
    /// The publication Thursday; weekday headings are resolved against it.
    anchor: NaiveDate,
    /// Dates of the current section.
    dates: Option<DateRange>,
    /// Tag of the heading being read or last read.
    heading: Option<String>,
    event: Option<DraftEvent>,
    emitted: usize,
}

impl<R: BufRead> Parser<R> {
    pub fn new(source: R, anchor: NaiveDate, patterns: Arc<PatternTable>) -> Self {
        Self {
            tokens: TokenReader::new(source),
            patterns,
            anchor,
            dates: None,
            heading: None,
            event: None,
            emitted: 0,
        }
    }

    /// Parses the whole document, emitting drafts as paragraphs complete.
    ///
    /// Returns the number of drafts emitted. On error, drafts emitted before
    /// the failure have already been handed to `sink`.
    pub fn run<S: EventSink>(mut self, sink: &mut S) -> ExtractResult<usize> {
        let mut state = State::Root;
        while state != State::Done {
            trace!(?state, "Parser state");
            state = self.step(state, sink)?;
        }
        debug!(emitted = self.emitted, "Parser reached end of input");
        Ok(self.emitted)
    }

    fn step<S: EventSink>(&mut self, state: State, sink: &mut S) -> ExtractResult<State> {
        match state {
            State::Root => self.parse_root(),
            State::Header => self.parse_header(),
            State::Section => self.parse_section(),
            State::Paragraph => self.parse_paragraph(sink),
            State::Link => self.parse_link(sink),
            State::Bold => self.parse_bold(sink),
            State::Ignore(scope) => self.skip_raw_element(scope),
            State::Done => Ok(State::Done),
        }
    }

    fn parse_root(&mut self) -> ExtractResult<State> {
        loop {
            match self.tokens.next_token()? {
                Token::Eof => return Ok(State::Done),
                Token::StartTag(tag) if is_heading(&tag.name) => {
                    self.heading = Some(tag.name);
                    return Ok(State::Header);
                }
                Token::StartTag(tag) if is_raw_text(&tag.name) => {
                    return Ok(State::Ignore(Scope::Root));
                }
                _ => {}
            }
        }
    }

    /// Reads a heading; a date heading opens a section, anything else is skipped.
    fn parse_header(&mut self) -> ExtractResult<State> {
        let mut text = String::new();
        loop {
            match self.tokens.next_token()? {
                Token::Eof => return Ok(State::Done),
                Token::Text(t) => text.push_str(&t),
                Token::EndTag(name) if self.heading.as_ref() == Some(&name) => {
                    return Ok(self.open_section(&text));
                }
                _ => {}
            }
        }
    }

    fn open_section(&mut self, text: &str) -> State {
        let heading = self.heading.as_deref().unwrap_or_default();
        let Some(header) = self.patterns.match_date_header(text) else {
            debug!(heading, text = text.trim(), "Skipping heading without a date");
            return State::Root;
        };

        match self.resolve_dates(&header) {
            Some(dates) => {
                debug!(
                    heading,
                    start = %dates.start,
                    end = ?dates.end,
                    days = dates.days(),
                    month = %header.month,
                    day = header.first_day,
                    "Entering dated section"
                );
                self.dates = Some(dates);
                State::Section
            }
            None => {
                warn!(heading, text = text.trim(), "Skipping heading with unresolved weekday");
                State::Root
            }
        }
    }

    fn resolve_dates(&self, header: &DateHeader) -> Option<DateRange> {
        let start = self.day_of(&header.start_weekday)?;
        let end = match &header.end_weekday {
            Some(weekday) => Some(self.day_of(weekday)?),
            None => None,
        };
        Some(DateRange::new(start, end))
    }

    fn day_of(&self, weekday: &str) -> Option<NaiveDate> {
        self.anchor
            .checked_add_days(Days::new(weekday_offset(weekday)?))
    }

    fn parse_section(&mut self) -> ExtractResult<State> {
        loop {
            match self.tokens.next_token()? {
                Token::Eof => return Ok(State::Done),
                Token::StartTag(tag) => {
                    if is_heading(&tag.name) {
                        self.heading = Some(tag.name);
                        return Ok(State::Header);
                    }
                    if tag.name == "p" {
                        let Some(dates) = self.dates else {
                            return Ok(State::Root);
                        };
                        self.event = Some(DraftEvent::new(dates));
                        return Ok(State::Paragraph);
                    }
                    if is_raw_text(&tag.name) {
                        return Ok(State::Ignore(Scope::Section));
                    }
                }
                _ => {}
            }
        }
    }

    /// Collects paragraph content. Bold and link tags are peeked, not
    /// consumed, so their own states see the opening tag.
    fn parse_paragraph<S: EventSink>(&mut self, sink: &mut S) -> ExtractResult<State> {
        loop {
            let emit = match self.tokens.peek()? {
                Token::Eof => {
                    self.emit(sink)?;
                    return Ok(State::Done);
                }
                Token::Text(text) => {
                    if let Some(event) = self.event.as_mut() {
                        event.push_body(text);
                    }
                    false
                }
                Token::StartTag(tag) => match tag.name.as_str() {
                    "b" | "strong" => return Ok(State::Bold),
                    "a" => return Ok(State::Link),
                    "li" => {
                        if let Some(event) = self.event.as_mut() {
                            event.push_body("- ");
                        }
                        false
                    }
                    "ul" | "ol" | "span" | "div" => false,
                    // Any other element ends the paragraph and is left for
                    // the section to handle.
                    _ => true,
                },
                Token::EndTag(name) => name == "p",
                Token::SelfClosingTag(_) => false,
            };

            if emit {
                self.emit(sink)?;
                return Ok(State::Section);
            }
            self.tokens.next_token()?;
        }
    }

    fn parse_link<S: EventSink>(&mut self, sink: &mut S) -> ExtractResult<State> {
        let mut href: Option<String> = None;
        let mut call_to_action = false;
        loop {
            match self.tokens.next_token()? {
                Token::Eof => {
                    self.emit(sink)?;
                    return Ok(State::Done);
                }
                Token::StartTag(tag) if tag.name == "a" => {
                    if let Some(value) = tag.attr("href") {
                        href = Some(value.to_string());
                    }
                }
                Token::Text(text) => {
                    if self.patterns.is_call_to_action(&text) {
                        call_to_action = true;
                    } else if let Some(event) = self.event.as_mut() {
                        event.push_body(&text);
                    }
                }
                Token::EndTag(name) if name == "a" => {
                    if let Some(event) = self.event.as_mut() {
                        match href {
                            Some(href) if call_to_action => event.link = Some(href),
                            Some(href) => event.push_body(&format!(" ({href})")),
                            None => {}
                        }
                    }
                    return Ok(State::Paragraph);
                }
                _ => {}
            }
        }
    }

    fn parse_bold<S: EventSink>(&mut self, sink: &mut S) -> ExtractResult<State> {
        loop {
            match self.tokens.next_token()? {
                Token::Eof => {
                    self.emit(sink)?;
                    return Ok(State::Done);
                }
                Token::Text(text) => {
                    if let Some(event) = self.event.as_mut() {
                        if event.title.is_empty() {
                            event.title = text;
                        } else {
                            event.push_body(&text);
                        }
                    }
                }
                Token::EndTag(name) if is_bold(&name) => return Ok(State::Paragraph),
                _ => {}
            }
        }
    }

    fn skip_raw_element(&mut self, scope: Scope) -> ExtractResult<State> {
        loop {
            match self.tokens.next_token()? {
                Token::Eof => return Ok(State::Done),
                Token::EndTag(name) if is_raw_text(&name) => return Ok(scope.into()),
                _ => {}
            }
        }
    }

    fn emit<S: EventSink>(&mut self, sink: &mut S) -> ExtractResult<()> {
        if let Some(draft) = self.event.take() {
            trace!(title = draft.title.trim(), "Emitting draft event");
            sink.emit(draft)?;
            self.emitted += 1;
        }
        Ok(())
    }
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5")
}

fn is_bold(name: &str) -> bool {
    matches!(name, "b" | "strong")
}

fn is_raw_text(name: &str) -> bool {
    matches!(name, "script" | "style")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Thursday, May 9 2024.
    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 9).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn parse(html: &str) -> Vec<DraftEvent> {
        let mut drafts = Vec::new();
        let emitted = Parser::new(html.as_bytes(), anchor(), PatternTable::shared())
            .run(&mut drafts)
            .unwrap();
        assert_eq!(emitted, drafts.len());
        drafts
    }

    #[test]
    fn paragraph_in_dated_section() {
        let drafts = parse(
            r#"<h2>Thursday, May 9</h2>
            <p><b>Trivia Night at The Pub</b> Join us from 7 p.m. to 9 p.m. for trivia.
            <a href="https://pub.example/trivia">Learn more here.</a></p>"#,
        );
        assert_eq!(drafts.len(), 1);
        let draft = &drafts[0];
        assert_eq!(draft.dates, DateRange::single(day(9)));
        assert_eq!(draft.title, "Trivia Night at The Pub");
        assert!(draft.body().contains("Join us from 7 p.m. to 9 p.m. for trivia."));
        assert!(!draft.body().contains("Learn more"));
        assert_eq!(draft.link.as_deref(), Some("https://pub.example/trivia"));
    }

    #[test]
    fn weekday_range_heading() {
        let drafts = parse("<h3>Friday – Sunday, May 10-12</h3><p><b>Festival</b></p>");
        assert_eq!(drafts[0].dates, DateRange::new(day(10), Some(day(12))));
    }

    #[test]
    fn reversed_weekday_range_is_swapped() {
        let drafts = parse("<h3>Sunday &amp; Friday, May 12 &amp; 10</h3><p><b>Fair</b></p>");
        assert_eq!(drafts[0].dates.start, day(10));
        assert_eq!(drafts[0].dates.end, Some(day(12)));
    }

    #[test]
    fn paragraphs_before_any_date_heading_are_ignored() {
        let drafts = parse(
            "<p><b>Intro</b> Welcome to the guide.</p>\
             <h1>Little Rock Weekend Guide</h1><p><b>Sponsor</b></p>\
             <h2>Saturday, May 11</h2><p><b>Market</b></p>",
        );
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Market");
        assert_eq!(drafts[0].dates, DateRange::single(day(11)));
    }

    #[test]
    fn unrecognized_heading_ends_section() {
        let drafts = parse(
            "<h2>Friday, May 10</h2><p><b>Concert</b></p>\
             <h2>More things to do</h2><p><b>Not an event</b></p>",
        );
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Concert");
    }

    #[test]
    fn heading_closes_only_on_its_own_end_tag() {
        let drafts = parse("<h2>Friday, May 10</h3>, more</h2><p><b>Show</b></p>");
        assert!(drafts.is_empty());

        let drafts = parse("<h2>Friday, <em>May 10</em></h2><p><b>Show</b></p>");
        assert_eq!(drafts.len(), 1);
    }

    #[test]
    fn events_keep_document_order() {
        let drafts = parse(
            "<h2>Thursday, May 9</h2><p><b>One</b></p><p><b>Two</b></p>\
             <h2>Sunday, May 12</h2><p><b>Three</b></p>",
        );
        let titles: Vec<_> = drafts.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, ["One", "Two", "Three"]);
        assert_eq!(drafts[2].dates, DateRange::single(day(12)));
    }

    #[test]
    fn plain_link_appends_href() {
        let drafts = parse(
            r#"<h2>Friday, May 10</h2><p><b>Gallery Walk</b> Starts at <a href="https://art.example">the Arts Center</a>.</p>"#,
        );
        assert_eq!(
            drafts[0].body(),
            " Starts at the Arts Center (https://art.example)."
        );
        assert_eq!(drafts[0].link, None);
    }

    #[test]
    fn last_href_wins() {
        let drafts = parse(
            r#"<h2>Friday, May 10</h2><p><b>Show</b><a href="https://first.example" href="https://second.example">Learn more here</a></p>"#,
        );
        assert_eq!(drafts[0].link.as_deref(), Some("https://second.example"));
    }

    #[test]
    fn unquoted_href_with_trailing_slash_is_a_link() {
        let drafts = parse(
            "<h2>Friday, May 10</h2><p><b>Show</b> info <a href=https://x.example/>Learn more here</a></p>",
        );
        assert_eq!(drafts[0].body(), " info ");
        assert_eq!(drafts[0].link.as_deref(), Some("https://x.example/"));
    }

    #[test]
    fn bare_less_than_stays_in_body() {
        let drafts = parse("<h2>Friday, May 10</h2><p><b>Kids</b> Ages 5 < 12 welcome at 7 p.m.</p>");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].body(), " Ages 5 < 12 welcome at 7 p.m.");
    }

    #[test]
    fn ampersands_in_title_and_body() {
        let drafts = parse(
            "<h2>Friday, May 10</h2><p><b>Rock & Roll &amp; Blues</b> Tom &amp; Jerry & co</p>",
        );
        assert_eq!(drafts[0].title, "Rock & Roll & Blues");
        assert_eq!(drafts[0].body(), " Tom & Jerry & co");
    }

    #[test]
    fn list_items_are_marked() {
        let drafts = parse(
            "<h2>Saturday, May 11</h2><p><b>Lineup</b><ul><li>Band A</li><li>Band B</li></ul></p>",
        );
        assert_eq!(drafts[0].body(), "- Band A- Band B");
    }

    #[test]
    fn second_bold_run_goes_to_body() {
        let drafts = parse("<h2>Friday, May 10</h2><p><strong>Title</strong> and <b>more</b></p>");
        assert_eq!(drafts[0].title, "Title");
        assert_eq!(drafts[0].body(), " and more");
    }

    #[test]
    fn whitespace_bold_run_still_claims_title() {
        let drafts = parse("<h2>Friday, May 10</h2><p><b> </b> Some text <b>bold word</b></p>");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, " ");
        assert_eq!(drafts[0].body(), " Some text bold word");
    }

    #[test]
    fn sibling_block_tag_ends_paragraph() {
        let drafts = parse(
            "<h2>Friday, May 10</h2><p><b>First</b> no closing tag\
             <p><b>Second</b></p>\
             <p><b>Third</b> before heading<h2>Saturday, May 11</h2><p><b>Fourth</b></p>",
        );
        let titles: Vec<_> = drafts.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second", "Third", "Fourth"]);
        assert_eq!(drafts[2].dates, DateRange::single(day(10)));
        assert_eq!(drafts[3].dates, DateRange::single(day(11)));
    }

    #[test]
    fn line_break_tag_ends_paragraph() {
        let drafts = parse("<h2>Friday, May 10</h2><p><b>Title</b> one<br>two</p>");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].body(), " one");
    }

    #[test]
    fn self_closing_tags_are_skipped() {
        let drafts = parse("<h2>Friday, May 10</h2><p><b>Title</b> one<br/>two</p>");
        assert_eq!(drafts[0].body(), " onetwo");
    }

    #[test]
    fn unterminated_paragraph_is_emitted_at_end_of_input() {
        let drafts = parse("<h2>Friday, May 10</h2><p><b>Last</b> trailing text");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].body(), " trailing text");
    }

    #[test]
    fn paragraph_without_bold_is_still_emitted() {
        let drafts = parse("<h2>Friday, May 10</h2><p>Just text</p>");
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].title.is_empty());
    }

    #[test]
    fn scripts_are_skipped() {
        let drafts = parse(
            "<script>var p = '<h2>Friday, May 10</h2>';</script>\
             <h2>Friday, May 10</h2>\
             <script>document.write('<p><b>x</b></p>')</script>\
             <p><b>Real</b></p>",
        );
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Real");
    }

    #[test]
    fn malformed_input_aborts_after_earlier_drafts() {
        let html = "<h2>Friday, May 10</h2><p><b>Kept</b></p><p><b>Lost</b><a href=";
        let mut drafts = Vec::new();
        let err = Parser::new(html.as_bytes(), anchor(), PatternTable::shared())
            .run(&mut drafts)
            .unwrap_err();
        assert!(err.is_input_error());
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Kept");
    }

    #[test]
    fn closed_channel_stops_parser() {
        let (mut tx, rx) = mpsc::channel::<DraftEvent>(1);
        drop(rx);
        let err = Parser::new(
            "<h2>Friday, May 10</h2><p><b>A</b></p>".as_bytes(),
            anchor(),
            PatternTable::shared(),
        )
        .run(&mut tx)
        .unwrap_err();
        assert!(matches!(err, ExtractError::PipelineClosed));
    }
}
