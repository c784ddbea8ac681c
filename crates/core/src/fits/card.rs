//! Header records, backed by the `fitsio` card type.

use fitsio::header::Card as RawCard;
use fitsio::value::Value;
use serde::Serialize;

/// Keywords are stored in the fixed 8-byte keyword field.
pub const KEYWORD_LEN: usize = 8;

/// Keyword of long-string continuation records.
const CONTINUE: &str = "CONTINUE";

/// Keyword of long-keyword records, which are never edited.
const HIERARCH: &str = "HIERARCH";

/// A header value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FitsValue {
    Logical(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FitsValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FitsValue::Float(f) => Some(*f),
            FitsValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FitsValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FitsValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FitsValue::Logical(b) => Some(*b),
            _ => None,
        }
    }

    fn from_raw(value: &Value) -> Option<Self> {
        match value {
            Value::Logical(b) => Some(FitsValue::Logical(*b)),
            Value::Integer(i) => Some(FitsValue::Integer(*i)),
            Value::Float(f) => Some(FitsValue::Float(*f)),
            Value::String(s) => Some(FitsValue::Text(s.trim_end().to_string())),
            _ => None,
        }
    }

    fn to_raw(&self) -> Value {
        match self {
            FitsValue::Logical(b) => Value::Logical(*b),
            FitsValue::Integer(i) => Value::Integer(*i),
            FitsValue::Float(f) => Value::Float(*f),
            FitsValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl std::fmt::Display for FitsValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitsValue::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            FitsValue::Integer(i) => write!(f, "{}", i),
            FitsValue::Float(v) => write!(f, "{:?}", v),
            FitsValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One logical header record.
///
/// A string value spread over `CONTINUE` records is held as a single card:
/// the head value keeps its trailing `&` and every continuation segment is
/// kept in order, so moving the card moves the whole string.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    keyword: String,
    value: Option<FitsValue>,
    comment: Option<String>,
    continuation: Vec<String>,
}

impl Card {
    /// Builds a value card. Keywords are upper-cased and cut to 8 bytes.
    pub fn new(keyword: &str, value: FitsValue, comment: Option<&str>) -> Self {
        Self {
            keyword: normalize_keyword(keyword),
            value: Some(value),
            comment: comment.map(str::to_string),
            continuation: Vec::new(),
        }
    }

    /// Builds a commentary card such as COMMENT or HISTORY.
    pub fn commentary(keyword: &str, text: &str) -> Self {
        Self {
            keyword: normalize_keyword(keyword),
            value: None,
            comment: Some(text.to_string()),
            continuation: Vec::new(),
        }
    }

    /// Adds a `CONTINUE` segment to a string value.
    pub fn continued(mut self, segment: &str) -> Self {
        self.continuation.push(segment.to_string());
        self
    }

    /// Converts a parsed record. A `CONTINUE` record that reaches here has
    /// no owner and is kept as commentary, as is a HIERARCH record.
    pub(crate) fn from_raw(raw: &RawCard) -> Self {
        let keyword = raw.keyword_str();
        let keyword = keyword.trim_end();
        if keyword == CONTINUE || keyword == HIERARCH {
            let text = match &raw.value {
                Some(Value::String(s)) => format!("'{}'", s.trim_end()),
                _ => raw.comment.as_deref().unwrap_or_default().trim().to_string(),
            };
            return Self::commentary(keyword, &text);
        }
        Self {
            keyword: keyword.to_string(),
            value: raw.value.as_ref().and_then(FitsValue::from_raw),
            comment: raw
                .comment
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            continuation: Vec::new(),
        }
    }

    /// Appends the records for this card, continuation records included.
    pub(crate) fn to_raw(&self, out: &mut Vec<RawCard>) {
        out.push(RawCard {
            keyword: keyword_field(&self.keyword),
            value: self.value.as_ref().map(FitsValue::to_raw),
            comment: self.comment.clone(),
        });
        for segment in &self.continuation {
            out.push(RawCard {
                keyword: keyword_field(CONTINUE),
                value: None,
                comment: Some(format!("  '{}'", segment.replace('\'', "''"))),
            });
        }
    }

    /// Whether a `CONTINUE` record may follow this card.
    pub(crate) fn expects_continuation(&self) -> bool {
        matches!(&self.value, Some(FitsValue::Text(s)) if s.ends_with('&'))
            && self.continuation.last().map_or(true, |s| s.ends_with('&'))
    }

    /// Attaches a raw `CONTINUE` record; returns false when it carries no
    /// quoted segment.
    pub(crate) fn absorb_continuation(&mut self, raw: &RawCard) -> bool {
        let segment = match (&raw.value, raw.comment.as_deref()) {
            (Some(Value::String(s)), _) => Some(s.trim_end().to_string()),
            (None, Some(text)) => unquote(text.trim()),
            _ => None,
        };
        match segment {
            Some(segment) => {
                self.continuation.push(segment);
                true
            }
            None => false,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// The value, with any `CONTINUE` segments joined into one string.
    pub fn value(&self) -> Option<FitsValue> {
        match &self.value {
            Some(FitsValue::Text(head)) if !self.continuation.is_empty() => {
                let mut text = head.clone();
                for segment in &self.continuation {
                    if text.ends_with('&') {
                        text.pop();
                    }
                    text.push_str(segment);
                }
                Some(FitsValue::Text(text))
            }
            other => other.clone(),
        }
    }

    /// Free text of a commentary card, or the comment of a value card.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// `CONTINUE` segments attached to this card.
    pub fn continuation(&self) -> &[String] {
        &self.continuation
    }

    /// Whether this card carries free text rather than a keyword value.
    pub fn is_commentary(&self) -> bool {
        self.value.is_none()
    }

    pub(crate) fn is_continue_keyword(raw: &RawCard) -> bool {
        raw.keyword_str().trim_end() == CONTINUE
    }
}

fn normalize_keyword(keyword: &str) -> String {
    keyword
        .trim()
        .to_uppercase()
        .chars()
        .take(KEYWORD_LEN)
        .collect()
}

fn keyword_field(keyword: &str) -> [u8; KEYWORD_LEN] {
    let mut field = [b' '; KEYWORD_LEN];
    let len = keyword.len().min(KEYWORD_LEN);
    field[..len].copy_from_slice(&keyword.as_bytes()[..len]);
    field
}

/// Text between the first pair of quotes, with doubled quotes unescaped.
fn unquote(text: &str) -> Option<String> {
    let body = text.strip_prefix('\'')?;
    let mut out = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                out.push('\'');
                chars.next();
                continue;
            }
            return Some(out.trim_end().to_string());
        }
        out.push(c);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_card_normalizes_keyword() {
        let card = Card::new("crval1", FitsValue::Float(10.0), Some("deg"));
        assert_eq!(card.keyword(), "CRVAL1");
        assert_eq!(card.value(), Some(FitsValue::Float(10.0)));
        assert_eq!(card.comment(), Some("deg"));
        assert!(!card.is_commentary());

        let long = Card::new("EXPOSURETIME", FitsValue::Integer(1), None);
        assert_eq!(long.keyword(), "EXPOSURE");
    }

    #[test]
    fn test_commentary_card() {
        let history = Card::commentary("history", "bias subtracted");
        assert!(history.is_commentary());
        assert_eq!(history.keyword(), "HISTORY");
        assert_eq!(history.comment(), Some("bias subtracted"));
        assert_eq!(history.value(), None);
    }

    #[test]
    fn test_continued_string_joins_segments() {
        let card = Card::new(
            "PLTSOLVD",
            FitsValue::Text("solved with a &".into()),
            None,
        )
        .continued("long description&")
        .continued(" of the fit");
        assert_eq!(
            card.value(),
            Some(FitsValue::Text(
                "solved with a long description of the fit".to_string()
            ))
        );
        assert!(!card.expects_continuation());
    }

    #[test]
    fn test_continuation_records_follow_head() {
        let card = Card::new("PLTSOLVD", FitsValue::Text("part one &".into()), None)
            .continued("it's part two");
        let mut raw = Vec::new();
        card.to_raw(&mut raw);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[1].keyword_str().trim_end(), "CONTINUE");
        assert_eq!(raw[1].comment.as_deref(), Some("  'it''s part two'"));
    }

    #[test]
    fn test_absorb_quoted_continuation() {
        let mut card = Card::new("PLTSOLVD", FitsValue::Text("a &".into()), None);
        assert!(card.expects_continuation());
        let record = RawCard {
            keyword: keyword_field("CONTINUE"),
            value: None,
            comment: Some("  'b''c'  ".to_string()),
        };
        assert!(card.absorb_continuation(&record));
        assert_eq!(card.value(), Some(FitsValue::Text("ab'c".to_string())));

        let bare = RawCard {
            keyword: keyword_field("CONTINUE"),
            value: None,
            comment: Some("no quotes here".to_string()),
        };
        assert!(!card.absorb_continuation(&bare));
    }

    #[test]
    fn test_display_keeps_float_point() {
        assert_eq!(FitsValue::Float(10.0).to_string(), "10.0");
        assert_eq!(FitsValue::Logical(true).to_string(), "T");
        assert_eq!(FitsValue::Text("RA---TAN".into()).to_string(), "RA---TAN");
    }
}
