//! Atom feed normalizer. Turns an arXiv API response into `PaperRecord`s.
//!
//! The document is read once with a namespace-aware streaming reader. Each
//! `<entry>` is collected independently: an entry missing its title or id, or
//! carrying an unparsable timestamp, is dropped with a diagnostic while the
//! rest of the feed is still returned. A document that is not well-formed XML
//! yields no papers at all, again with a diagnostic rather than an error.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::EntryError;
use crate::types::PaperRecord;

pub const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";
pub const ARXIV_NS: &[u8] = b"http://arxiv.org/schemas/atom";
pub const OPENSEARCH_NS: &[u8] = b"http://a9.com/-/spec/opensearch/1.1/";

/// Something worth reporting about a parsed feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedDiagnostic {
    /// The whole document was rejected; no papers were returned.
    MalformedDocument { message: String },
    /// One entry was skipped; the others are unaffected.
    EntryDropped {
        index: usize,
        id: Option<String>,
        reason: EntryError,
    },
}

impl fmt::Display for FeedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedDiagnostic::MalformedDocument { message } => {
                write!(f, "malformed feed: {}", message)
            }
            FeedDiagnostic::EntryDropped { index, id, reason } => match id {
                Some(id) => write!(f, "entry #{} ({}) dropped: {}", index, id, reason),
                None => write!(f, "entry #{} dropped: {}", index, reason),
            },
        }
    }
}

/// Papers plus everything the parser noticed along the way.
#[derive(Debug, Clone, Default)]
pub struct FeedReport {
    pub papers: Vec<PaperRecord>,
    pub diagnostics: Vec<FeedDiagnostic>,
    /// `opensearch:totalResults`, when the feed carries it.
    pub total_results: Option<usize>,
}

impl FeedReport {
    pub fn is_malformed(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, FeedDiagnostic::MalformedDocument { .. }))
    }

    pub fn dropped_entries(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, FeedDiagnostic::EntryDropped { .. }))
            .count()
    }
}

/// Parse an arXiv Atom document into paper records.
///
/// Never fails: malformed input produces an empty list (see `parse_feed_report`
/// for the diagnostics).
pub fn parse_feed(xml: &str) -> Vec<PaperRecord> {
    parse_feed_report(xml).papers
}

/// Parse an arXiv Atom document, keeping per-entry and document diagnostics.
pub fn parse_feed_report(xml: &str) -> FeedReport {
    let mut report = match FeedParser::default().run(xml) {
        Ok(report) => report,
        Err(message) => {
            tracing::error!(error = %message, "Failed to parse arXiv feed");
            FeedReport {
                papers: Vec::new(),
                diagnostics: vec![FeedDiagnostic::MalformedDocument { message }],
                total_results: None,
            }
        }
    };
    report.papers.shrink_to_fit();
    tracing::debug!(
        papers = report.papers.len(),
        dropped = report.dropped_entries(),
        total_results = ?report.total_results,
        "Parsed arXiv feed"
    );
    report
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns {
    Atom,
    Arxiv,
    OpenSearch,
    Other,
}

impl Ns {
    fn of(resolved: &ResolveResult<'_>) -> Self {
        match resolved {
            ResolveResult::Bound(Namespace(uri)) if *uri == ATOM_NS => Ns::Atom,
            ResolveResult::Bound(Namespace(uri)) if *uri == ARXIV_NS => Ns::Arxiv,
            ResolveResult::Bound(Namespace(uri)) if *uri == OPENSEARCH_NS => Ns::OpenSearch,
            _ => Ns::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Title,
    Summary,
    Published,
    Updated,
    Id,
}

/// What an open element means to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Feed,
    Entry,
    Field(TextField),
    Author,
    AuthorName,
    TotalResults,
    Link,
    PrimaryCategory,
    Other,
}

impl Node {
    fn captures_text(self) -> bool {
        matches!(
            self,
            Node::Field(_) | Node::AuthorName | Node::TotalResults
        )
    }
}

#[derive(Debug, Default)]
struct EntryBuilder {
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    id: Option<String>,
    authors: Vec<String>,
    pdf_url: Option<String>,
    categories: BTreeSet<String>,
}

impl EntryBuilder {
    /// First occurrence wins for repeated single-valued elements.
    fn set(&mut self, field: TextField, text: String) {
        let slot = match field {
            TextField::Title => &mut self.title,
            TextField::Summary => &mut self.summary,
            TextField::Published => &mut self.published,
            TextField::Updated => &mut self.updated,
            TextField::Id => &mut self.id,
        };
        if slot.is_none() {
            *slot = Some(text);
        }
    }

    fn id_hint(&self) -> Option<String> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn apply_link(&mut self, e: &BytesStart<'_>) {
        if self.pdf_url.is_some() {
            return;
        }
        let mut title = None;
        let mut href = None;
        for attr in e.attributes().flatten() {
            let Ok(value) = attr.unescape_value() else {
                continue;
            };
            match attr.key.as_ref() {
                b"title" => title = Some(value.into_owned()),
                b"href" => href = Some(value.into_owned()),
                _ => {}
            }
        }
        if title.as_deref() == Some("pdf") {
            self.pdf_url = href.map(|h| h.trim().to_string()).filter(|h| !h.is_empty());
        }
    }

    fn apply_primary_category(&mut self, e: &BytesStart<'_>) {
        for attr in e.attributes().flatten() {
            if attr.key.as_ref() != b"term" {
                continue;
            }
            if let Ok(value) = attr.unescape_value() {
                let term = value.trim();
                if !term.is_empty() {
                    self.categories.insert(term.to_string());
                }
            }
        }
    }

    fn finish(self) -> Result<PaperRecord, EntryError> {
        let title = self
            .title
            .map(|t| normalize_whitespace(&t))
            .filter(|t| !t.is_empty())
            .ok_or(EntryError::MissingTitle)?;
        let id = self
            .id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(EntryError::MissingId)?;
        let published = parse_timestamp("published", self.published)?;
        let updated = parse_timestamp("updated", self.updated)?;

        Ok(PaperRecord {
            title,
            authors: self.authors,
            summary: self.summary.map(|s| s.trim().to_string()).unwrap_or_default(),
            published,
            updated,
            id,
            pdf_url: self.pdf_url,
            categories: self.categories,
        })
    }
}

fn parse_timestamp(
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, EntryError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|_| EntryError::InvalidTimestamp {
            field,
            value: raw.to_string(),
        })
}

#[derive(Debug, Default)]
struct FeedParser {
    stack: Vec<Node>,
    text: String,
    entry: Option<EntryBuilder>,
    entry_index: usize,
    saw_root: bool,
    report: FeedReport,
}

impl FeedParser {
    fn run(mut self, xml: &str) -> Result<FeedReport, String> {
        // Text runs are kept verbatim; fields are trimmed or normalized on close.
        let mut reader = NsReader::from_str(xml);

        loop {
            let (resolved, event) = reader.read_resolved_event().map_err(|e| e.to_string())?;
            let ns = Ns::of(&resolved);

            match event {
                Event::Start(e) => {
                    let node = self.classify(ns, e.local_name().as_ref());
                    self.open(node, &e);
                    self.stack.push(node);
                }
                Event::Empty(e) => {
                    let node = self.classify(ns, e.local_name().as_ref());
                    self.open(node, &e);
                    self.close(node);
                }
                Event::Text(t) => {
                    if self.capturing() {
                        let text = t.unescape().map_err(|e| e.to_string())?;
                        self.text.push_str(&text);
                    }
                }
                Event::CData(c) => {
                    if self.capturing() {
                        self.text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::End(_) => {
                    let node = self
                        .stack
                        .pop()
                        .ok_or_else(|| "closing tag without a matching start".to_string())?;
                    self.close(node);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(format!("document ended inside an open {:?} element", open));
        }
        if !self.saw_root {
            return Err("document has no root element".to_string());
        }
        Ok(self.report)
    }

    /// True while inside a text field, including markup nested within it.
    fn capturing(&self) -> bool {
        self.stack.iter().any(|n| n.captures_text())
    }

    fn classify(&mut self, ns: Ns, local: &[u8]) -> Node {
        let parent = match self.stack.last() {
            Some(parent) => *parent,
            None => {
                self.saw_root = true;
                return if ns == Ns::Atom && local == b"feed" {
                    Node::Feed
                } else if ns == Ns::Atom && local == b"entry" {
                    Node::Entry
                } else {
                    Node::Other
                };
            }
        };

        match (parent, ns, local) {
            (Node::Entry, Ns::Atom, b"title") => Node::Field(TextField::Title),
            (Node::Entry, Ns::Atom, b"summary") => Node::Field(TextField::Summary),
            (Node::Entry, Ns::Atom, b"published") => Node::Field(TextField::Published),
            (Node::Entry, Ns::Atom, b"updated") => Node::Field(TextField::Updated),
            (Node::Entry, Ns::Atom, b"id") => Node::Field(TextField::Id),
            (Node::Entry, Ns::Atom, b"author") => Node::Author,
            (Node::Author, Ns::Atom, b"name") => Node::AuthorName,
            (Node::Feed, Ns::OpenSearch, b"totalResults") => Node::TotalResults,
            (_, Ns::Atom, b"entry") if self.entry.is_none() => Node::Entry,
            (Node::Entry, Ns::Atom, b"link") => Node::Link,
            (Node::Entry, Ns::Arxiv, b"primary_category") => Node::PrimaryCategory,
            _ => Node::Other,
        }
    }

    fn open(&mut self, node: Node, e: &BytesStart<'_>) {
        if node.captures_text() {
            self.text.clear();
        }
        match node {
            Node::Entry => self.entry = Some(EntryBuilder::default()),
            Node::Link => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.apply_link(e);
                }
            }
            Node::PrimaryCategory => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.apply_primary_category(e);
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, node: Node) {
        match node {
            Node::Field(field) => {
                let text = std::mem::take(&mut self.text);
                if let Some(entry) = self.entry.as_mut() {
                    entry.set(field, text);
                }
            }
            Node::AuthorName => {
                let name = normalize_whitespace(&std::mem::take(&mut self.text));
                if let Some(entry) = self.entry.as_mut() {
                    if !name.is_empty() {
                        entry.authors.push(name);
                    }
                }
            }
            Node::TotalResults => {
                let text = std::mem::take(&mut self.text);
                self.report.total_results = text.trim().parse().ok();
            }
            Node::Entry => self.finish_entry(),
            Node::Feed | Node::Author | Node::Link | Node::PrimaryCategory | Node::Other => {}
        }
    }

    fn finish_entry(&mut self) {
        let Some(entry) = self.entry.take() else {
            return;
        };
        let index = self.entry_index;
        self.entry_index += 1;

        let id = entry.id_hint();
        match entry.finish() {
            Ok(paper) => self.report.papers.push(paper),
            Err(reason) => {
                tracing::warn!(index, id = ?id, reason = %reason, "Dropping malformed feed entry");
                self.report
                    .diagnostics
                    .push(FeedDiagnostic::EntryDropped { index, id, reason });
            }
        }
    }
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
