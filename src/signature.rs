//! Header signatures and format detection.
//!
//! A [`HeaderTemplate`] describes the header row an exchange writes. Each
//! template token is either a literal column name or, when wrapped in
//! `^...$`, a regular expression. A trailing `?` marks a token optional.

use crate::error::{ImportError, Result};
use crate::format::{ExchangeFormat, FormatRegistry};
use crate::reader::{clean_token, split_header};
use log::debug;
use regex::Regex;

/// Matches one header cell.
#[derive(Debug, Clone)]
pub enum TokenMatcher {
    Literal(String),
    Pattern(Regex),
}

impl TokenMatcher {
    /// Parses `^...$` as a regular expression and anything else literally.
    pub fn parse(token: &str) -> std::result::Result<Self, regex::Error> {
        if token.len() > 1 && token.starts_with('^') && token.ends_with('$') {
            Ok(TokenMatcher::Pattern(Regex::new(token)?))
        } else {
            Ok(TokenMatcher::Literal(clean_token(token)))
        }
    }

    pub fn matches(&self, header_token: &str) -> bool {
        let cleaned = clean_token(header_token);
        match self {
            TokenMatcher::Literal(lit) => *lit == cleaned,
            TokenMatcher::Pattern(re) => re.is_match(&cleaned),
        }
    }
}

#[derive(Debug, Clone)]
struct TemplateToken {
    matcher: TokenMatcher,
    optional: bool,
}

/// How template tokens relate to header tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    /// Template tokens appear, in order, as a subsequence of the header.
    Ordered,
    /// Every header token matches some template token, in any order.
    Unordered,
}

/// The header signature of one exchange format.
#[derive(Debug, Clone)]
pub struct HeaderTemplate {
    tokens: Vec<TemplateToken>,
    mode: MatchMode,
}

impl HeaderTemplate {
    pub fn ordered(tokens: &[&str]) -> std::result::Result<Self, regex::Error> {
        Self::build(tokens, MatchMode::Ordered)
    }

    pub fn unordered(tokens: &[&str]) -> std::result::Result<Self, regex::Error> {
        Self::build(tokens, MatchMode::Unordered)
    }

    fn build(tokens: &[&str], mode: MatchMode) -> std::result::Result<Self, regex::Error> {
        let tokens = tokens
            .iter()
            .map(|t| {
                let (body, optional) = match t.strip_suffix('?') {
                    Some(body) if !body.is_empty() => (body, true),
                    _ => (*t, false),
                };
                Ok(TemplateToken {
                    matcher: TokenMatcher::parse(body)?,
                    optional,
                })
            })
            .collect::<std::result::Result<Vec<_>, regex::Error>>()?;
        Ok(HeaderTemplate { tokens, mode })
    }

    /// Returns `true` if the header tokens carry this signature.
    pub fn matches(&self, header: &[String]) -> bool {
        if header.is_empty() {
            return false;
        }
        match self.mode {
            MatchMode::Ordered => self.matches_ordered(header),
            MatchMode::Unordered => self.matches_unordered(header),
        }
    }

    fn matches_ordered(&self, header: &[String]) -> bool {
        let mut pos = 0;
        for token in &self.tokens {
            match header[pos..].iter().position(|h| token.matcher.matches(h)) {
                Some(found) => pos += found + 1,
                None if token.optional => {}
                None => return false,
            }
        }
        true
    }

    fn matches_unordered(&self, header: &[String]) -> bool {
        let every_header_known = header
            .iter()
            .all(|h| self.tokens.iter().any(|t| t.matcher.matches(h)));
        let every_required_present = self
            .tokens
            .iter()
            .filter(|t| !t.optional)
            .all(|t| header.iter().any(|h| t.matcher.matches(h)));
        every_header_known && every_required_present
    }
}

/// The outcome of format detection.
#[derive(Debug)]
pub struct Detection<'a> {
    pub format: &'a ExchangeFormat,
    pub delimiter: u8,
    pub header: Vec<String>,
}

/// Finds the unique format whose signature matches `header_line`.
///
/// Delimiters are tried in the given order. A delimiter under which no
/// format matches escalates to the next one; two or more matching formats
/// is a registration defect and aborts immediately.
pub fn detect<'a>(
    registry: &'a FormatRegistry,
    header_line: &str,
    delimiters: &[u8],
) -> Result<Detection<'a>> {
    for &delimiter in delimiters {
        let header = split_header(header_line, delimiter)?;
        let matching: Vec<&ExchangeFormat> = registry
            .formats()
            .iter()
            .filter(|f| f.template.matches(&header))
            .collect();

        match matching.as_slice() {
            [] => {
                debug!(
                    "No format matches header with delimiter '{}'",
                    delimiter as char
                );
            }
            [format] => {
                debug!(
                    "Detected format '{}' with delimiter '{}'",
                    format.id, delimiter as char
                );
                return Ok(Detection {
                    format,
                    delimiter,
                    header,
                });
            }
            many => {
                return Err(ImportError::AmbiguousFormat {
                    header: header_line.to_string(),
                    formats: many.iter().map(|f| f.id).collect(),
                });
            }
        }
    }

    Err(ImportError::UnknownHeader {
        header: header_line.to_string(),
    })
}
