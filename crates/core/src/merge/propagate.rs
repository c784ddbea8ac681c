use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::fits::FitsHeader;

/// Keywords describing a frame's own data unit.
const STRUCTURAL_KEYWORDS: &[&str] = &[
    "SIMPLE", "BITPIX", "NAXIS", "EXTEND", "BZERO", "BSCALE", "PCOUNT", "GCOUNT", "END",
];

/// Whether a keyword describes the data unit layout (including `NAXISn`).
pub fn is_structural(keyword: &str) -> bool {
    if STRUCTURAL_KEYWORDS.contains(&keyword) {
        return true;
    }
    keyword
        .strip_prefix("NAXIS")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Value keywords present in only one of two headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordDiff {
    pub only_in_reference: Vec<String>,
    pub only_in_target: Vec<String>,
}

impl KeywordDiff {
    /// Compares keyword sets; commentary cards are not keywords.
    pub fn between(reference: &FitsHeader, target: &FitsHeader) -> Self {
        let reference_keys = reference.keywords();
        let target_keys = target.keywords();
        let reference_set: HashSet<&str> = reference_keys.iter().copied().collect();
        let target_set: HashSet<&str> = target_keys.iter().copied().collect();

        Self {
            only_in_reference: reference_keys
                .iter()
                .filter(|k| !target_set.contains(*k))
                .map(|k| k.to_string())
                .collect(),
            only_in_target: target_keys
                .iter()
                .filter(|k| !reference_set.contains(*k))
                .map(|k| k.to_string())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.only_in_reference.is_empty() && self.only_in_target.is_empty()
    }
}

/// A keyword added to a frame's header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopiedKeyword {
    pub keyword: String,
    /// Reference value rendered as text, long strings joined.
    pub value: String,
}

/// Copies missing keywords from a reference header.
#[derive(Debug, Clone)]
pub struct HeaderMerger {
    skip: HashSet<String>,
}

impl HeaderMerger {
    pub fn new(skip_keywords: &[String]) -> Self {
        Self {
            skip: skip_keywords
                .iter()
                .map(|k| k.trim().to_uppercase())
                .collect(),
        }
    }

    /// Whether a keyword is never propagated.
    pub fn is_skipped(&self, keyword: &str) -> bool {
        self.skip.contains(keyword) || is_structural(keyword)
    }

    /// Adds every non-skipped reference-only keyword to `target`.
    ///
    /// Cards are appended in reference order. A long string moves with its
    /// `CONTINUE` segments.
    pub fn merge(&self, reference: &FitsHeader, target: &mut FitsHeader) -> Vec<CopiedKeyword> {
        let diff = KeywordDiff::between(reference, target);
        let mut copied = Vec::new();

        for keyword in diff.only_in_reference {
            if self.is_skipped(&keyword) {
                debug!(keyword = %keyword, "Skipping keyword");
                continue;
            }
            let Some(card) = reference.get(&keyword) else {
                continue;
            };
            copied.push(CopiedKeyword {
                keyword: keyword.clone(),
                value: card.value().map(|v| v.to_string()).unwrap_or_default(),
            });
            target.set(card.clone());
        }
        copied
    }
}

impl Default for HeaderMerger {
    fn default() -> Self {
        Self::new(&["COMMENT".to_string(), "HISTORY".to_string()])
    }
}
