use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// How populated filters are joined.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

/// Filters collected from one invocation. Empty strings count as absent.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub query: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub since: Option<String>,
    pub before: Option<String>,
    pub has_attachments: bool,
    pub larger_than: Option<String>,
    pub smaller_than: Option<String>,
    pub combinator: Combinator,
    pub negate: bool,
}

/// Boolean search tree handed to the IMAP session.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum SearchPredicate {
    Body(String),
    Header { key: String, value: String },
    SizeAbove(u64),
    SizeBelow(u64),
    DateSince(NaiveDate),
    DateBefore(NaiveDate),
    And(Vec<SearchPredicate>),
    Or(Vec<SearchPredicate>),
    Not(Box<SearchPredicate>),
}

/// A message as seen by local predicate evaluation.
pub trait Searchable {
    fn body_contains(&self, needle: &str) -> bool;
    fn header_contains(&self, key: &str, needle: &str) -> bool;
    fn size(&self) -> u64;
    fn date(&self) -> Option<NaiveDate>;
}

impl SearchPredicate {
    pub fn match_all() -> Self {
        Self::And(Vec::new())
    }

    pub fn header(key: &str, value: impl Into<String>) -> Self {
        Self::Header {
            key: key.to_string(),
            value: value.into(),
        }
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluates the predicate with IMAP SEARCH semantics.
    pub fn matches<M: Searchable + ?Sized>(&self, message: &M) -> bool {
        match self {
            Self::Body(needle) => message.body_contains(needle),
            Self::Header { key, value } => message.header_contains(key, value),
            Self::SizeAbove(limit) => message.size() > *limit,
            Self::SizeBelow(limit) => message.size() < *limit,
            Self::DateSince(date) => message.date().is_some_and(|d| d >= *date),
            Self::DateBefore(date) => message.date().is_some_and(|d| d < *date),
            Self::And(nodes) => nodes.iter().all(|node| node.matches(message)),
            Self::Or(nodes) => nodes.iter().any(|node| node.matches(message)),
            Self::Not(node) => !node.matches(message),
        }
    }

    /// Number of leaf predicates in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::And(nodes) | Self::Or(nodes) => nodes.iter().map(Self::leaf_count).sum(),
            Self::Not(node) => node.leaf_count(),
            _ => 1,
        }
    }
}

/// Compiles filter options into a single predicate root.
pub fn build(opts: &SearchOptions) -> SearchPredicate {
    let leaves = leaves(opts);

    let root = match opts.combinator {
        Combinator::And => SearchPredicate::And(leaves),
        Combinator::Or => match leaves.len() {
            0 => SearchPredicate::match_all(),
            1 => leaves.into_iter().next().unwrap_or_else(SearchPredicate::match_all),
            _ => SearchPredicate::Or(leaves),
        },
    };

    if opts.negate { root.negate() } else { root }
}

fn leaves(opts: &SearchOptions) -> Vec<SearchPredicate> {
    let mut leaves = Vec::new();

    if let Some(query) = populated(&opts.query) {
        leaves.push(SearchPredicate::Body(query.to_string()));
    }
    if let Some(body) = populated(&opts.body) {
        leaves.push(SearchPredicate::Body(body.to_string()));
    }
    if let Some(from) = populated(&opts.from) {
        leaves.push(SearchPredicate::header("From", from));
    }
    if let Some(to) = populated(&opts.to) {
        leaves.push(SearchPredicate::header("To", to));
    }
    if let Some(subject) = populated(&opts.subject) {
        leaves.push(SearchPredicate::header("Subject", subject));
    }
    if let Some(raw) = populated(&opts.since) {
        match parse_date(raw) {
            Some(date) => leaves.push(SearchPredicate::DateSince(date)),
            None => warn!(value = raw, "ignoring unparsable --since date"),
        }
    }
    if let Some(raw) = populated(&opts.before) {
        match parse_date(raw) {
            Some(date) => leaves.push(SearchPredicate::DateBefore(date)),
            None => warn!(value = raw, "ignoring unparsable --before date"),
        }
    }
    if let Some(raw) = populated(&opts.larger_than) {
        match parse_size(raw) {
            Some(size) => leaves.push(SearchPredicate::SizeAbove(size)),
            None => warn!(value = raw, "ignoring unparsable --larger-than size"),
        }
    }
    if let Some(raw) = populated(&opts.smaller_than) {
        match parse_size(raw) {
            Some(size) => leaves.push(SearchPredicate::SizeBelow(size)),
            None => warn!(value = raw, "ignoring unparsable --smaller-than size"),
        }
    }
    // Heuristic: attachments usually ride in multipart/mixed.
    if opts.has_attachments {
        leaves.push(SearchPredicate::header("Content-Type", "multipart/mixed"));
    }

    leaves
}

fn populated(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).ok()
}

/// Parses sizes such as `1024`, `500K`, `1M`, `2GB` into bytes.
pub fn parse_size(input: &str) -> Option<u64> {
    let upper = input.trim().to_ascii_uppercase();
    let digits_end = upper
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(upper.len());
    let (digits, suffix) = upper.split_at(digits_end);
    let value = digits.parse::<u64>().ok()?;

    let multiplier: u64 = match suffix.trim() {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        _ => return None,
    };

    value.checked_mul(multiplier)
}

impl SearchOptions {
    /// Parses a compact query such as `from:alice subject:"weekly report" invoice`.
    ///
    /// Recognized prefixes are `from:`, `to:`, `subject:`, `body:`, `since:` and `before:`.
    /// Unprefixed terms are joined into the general body query.
    pub fn from_query(query: &str) -> Self {
        let mut opts = Self::default();
        let mut free_terms = Vec::new();

        for term in split_terms(query) {
            let Some((key, value)) = term.split_once(':') else {
                free_terms.push(unquote(&term));
                continue;
            };

            let value = unquote(value);
            match key.to_ascii_lowercase().as_str() {
                "from" => opts.from = Some(value),
                "to" => opts.to = Some(value),
                "subject" => opts.subject = Some(value),
                "body" => opts.body = Some(value),
                "since" => opts.since = Some(value),
                "before" => opts.before = Some(value),
                _ => free_terms.push(unquote(&term)),
            }
        }

        if !free_terms.is_empty() {
            opts.query = Some(free_terms.join(" "));
        }

        opts
    }
}

fn split_terms(query: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in query.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ch if ch.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    terms.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        terms.push(current);
    }

    terms
}

fn unquote(value: &str) -> String {
    value.trim_matches('"').to_string()
}
