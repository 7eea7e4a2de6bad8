//! Lexical extractor for relationship context.
//!
//! A table of regular-expression patterns, applied independently per field.
//! The extractor is a total function: it never fails, empty input yields an
//! empty record, and feeding it its own JSON output preserves the record.

// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// How much of the target the relationship covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextScope {
    /// Partial coverage ("partially implements").
    Partial,
    /// Full coverage ("fully solves").
    Full,
    /// Holds only under stated conditions.
    Conditional,
    /// Explicitly limited coverage.
    Limited,
}

impl ContextScope {
    /// Returns the wire string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Partial => "partial",
            Self::Full => "full",
            Self::Conditional => "conditional",
            Self::Limited => "limited",
        }
    }
}

impl fmt::Display for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured relationship context.
///
/// `text` always carries the original input verbatim; the remaining fields
/// are what the pattern table recognized in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipContext {
    /// The original input, unchanged.
    pub text: String,
    /// Coverage scope, when stated.
    #[serde(default)]
    pub scope: Option<ContextScope>,
    /// Components the relationship concerns ("auth module").
    #[serde(default)]
    pub components: Vec<String>,
    /// Conditions under which it holds ("production").
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Evidence backing it ("E2E tests").
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Version or date qualifier, when stated.
    #[serde(default)]
    pub temporal: Option<String>,
    /// Stated exceptions.
    #[serde(default)]
    pub exceptions: Vec<String>,
}

/// A capture pattern feeding one list field.
struct FieldPattern {
    pattern: Regex,
}

impl FieldPattern {
    fn new(pattern: &str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("static context pattern"),
        }
    }

    /// Collects trimmed first-group captures across the whole input.
    fn captures(&self, text: &str) -> Vec<String> {
        self.pattern
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| clean_capture(m.as_str()))
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Trims whitespace and trailing punctuation from a captured phrase.
fn clean_capture(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['.', ',', ';', ':', '!', '?'])
        .trim()
        .to_string()
}

static SCOPE_PARTIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(partial(?:ly)?|in\s+part|incomplete(?:ly)?)\b")
        .expect("static regex: scope partial")
});

static SCOPE_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(full(?:y)?|complete(?:ly)?|entirely|wholly)\b")
        .expect("static regex: scope full")
});

static SCOPE_CONDITIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(conditional(?:ly)?|only\s+(?:works|when|if|under|in|on)|depends\s+on\s+whether)\b")
        .expect("static regex: scope conditional")
});

static SCOPE_LIMITED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(limited|restricted|narrow(?:ly)?)\b").expect("static regex: scope limited")
});

static COMPONENT_PATTERNS: LazyLock<Vec<FieldPattern>> = LazyLock::new(|| {
    vec![
        // "implements the auth module", "affects payment service"
        FieldPattern::new(
            r"(?i)\b(?:implement(?:s|ed|ing)?|affect(?:s|ed|ing)?|cover(?:s|ed|ing)?|modif(?:y|ies|ied|ying)|update(?:s|d|ing)?|replace(?:s|d)?|extend(?:s|ed)?)\s+(?:the\s+)?([\w][\w\-\./ ]*?\s+(?:module|component|service|layer|subsystem|system|api|endpoint|handler|pipeline|function|class|crate|package))\b",
        ),
        // "in the auth module" without a verb
        FieldPattern::new(
            r"(?i)\b(?:in|of|for|within)\s+the\s+([\w][\w\-\./ ]*?\s+(?:module|component|service|layer|subsystem|system|api|endpoint|handler|pipeline|crate|package))\b",
        ),
    ]
});

static CONDITION_PATTERNS: LazyLock<Vec<FieldPattern>> = LazyLock::new(|| {
    vec![
        // "only works in production", "only under load"
        FieldPattern::new(
            r"(?i)\bonly\s+(?:works\s+|applies\s+|valid\s+)?(?:in|on|under|with|for|when|during)\s+([\w][\w\-\./ ]*)",
        ),
        // "requires feature flags", "when retries are enabled"
        FieldPattern::new(r"(?i)\brequires?\s+([\w][\w\-\./ ]*)"),
        FieldPattern::new(r"(?i)\bas\s+long\s+as\s+([\w][\w\-\./ ]*)"),
    ]
});

static EVIDENCE_PATTERNS: LazyLock<Vec<FieldPattern>> = LazyLock::new(|| {
    vec![
        // "verified by E2E tests", "confirmed via benchmarks"
        FieldPattern::new(
            r"(?i)\b(?:verif(?:y|ied)|confirm(?:s|ed)?|validat(?:e|ed)|prov(?:e|en|ed)|test(?:ed)?|measur(?:e|ed)|observ(?:e|ed)|support(?:ed)?)\s+(?:by|via|through|with|in)\s+([\w][\w\-\./ ]*)",
        ),
        FieldPattern::new(r"(?i)\baccording\s+to\s+([\w][\w\-\./ ]*)"),
    ]
});

static EXCEPTION_PATTERNS: LazyLock<Vec<FieldPattern>> = LazyLock::new(|| {
    vec![
        FieldPattern::new(r"(?i)\bexcept(?:\s+for|\s+in)?\s+([\w][\w\-\./ ]*)"),
        FieldPattern::new(r"(?i)\bbut\s+not\s+(?:for\s+|in\s+)?([\w][\w\-\./ ]*)"),
        FieldPattern::new(r"(?i)\bunless\s+([\w][\w\-\./ ]*)"),
        FieldPattern::new(r"(?i)\bdoes\s+not\s+(?:apply|work)\s+(?:to|in|for)\s+([\w][\w\-\./ ]*)"),
    ]
});

static TEMPORAL_PATTERNS: LazyLock<Vec<FieldPattern>> = LazyLock::new(|| {
    vec![
        // "since v2.3", "in version 1.0.4", "as of 2024-06-01"
        FieldPattern::new(r"(?i)\b(?:since|as\s+of|until|before|after|from)\s+(v?\d[\w\-\.]*)"),
        FieldPattern::new(r"(?i)\bversion\s+(v?\d[\w\-\.]*)"),
        FieldPattern::new(r"(\d{4}-\d{2}-\d{2})"),
        FieldPattern::new(r"\b(v\d+(?:\.\d+)+)\b"),
    ]
});

fn detect_scope(text: &str) -> Option<ContextScope> {
    // Order matters: an explicit "partially" wins over the "only works in"
    // conditional marker further down the sentence.
    if SCOPE_PARTIAL.is_match(text) {
        Some(ContextScope::Partial)
    } else if SCOPE_LIMITED.is_match(text) {
        Some(ContextScope::Limited)
    } else if SCOPE_CONDITIONAL.is_match(text) {
        Some(ContextScope::Conditional)
    } else if SCOPE_FULL.is_match(text) {
        Some(ContextScope::Full)
    } else {
        None
    }
}

fn collect(patterns: &[FieldPattern], text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for pattern in patterns {
        for capture in pattern.captures(text) {
            if !out.contains(&capture) {
                out.push(capture);
            }
        }
    }
    out
}

/// Extracts structured context from free text.
///
/// Total function: never fails. An empty input yields a record with
/// `text = ""` and empty fields. If the input is already the JSON encoding
/// of a [`RelationshipContext`], it is parsed and returned unchanged, so
/// re-extraction is idempotent.
#[must_use]
pub fn extract_relationship_context(text: &str) -> RelationshipContext {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return RelationshipContext::default();
    }

    // Idempotence: already-structured input passes through verbatim.
    if trimmed.starts_with('{')
        && let Ok(existing) = serde_json::from_str::<RelationshipContext>(trimmed)
    {
        return existing;
    }

    RelationshipContext {
        text: text.to_string(),
        scope: detect_scope(text),
        components: collect(&COMPONENT_PATTERNS, text),
        conditions: collect(&CONDITION_PATTERNS, text),
        evidence: collect(&EVIDENCE_PATTERNS, text),
        temporal: collect(&TEMPORAL_PATTERNS, text).into_iter().next(),
        exceptions: collect(&EXCEPTION_PATTERNS, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let ctx = extract_relationship_context("");
        assert_eq!(ctx.text, "");
        assert!(ctx.scope.is_none());
        assert!(ctx.components.is_empty());
        assert!(ctx.conditions.is_empty());
        assert!(ctx.evidence.is_empty());
        assert!(ctx.temporal.is_none());
        assert!(ctx.exceptions.is_empty());
    }

    #[test]
    fn test_full_extraction() {
        let ctx = extract_relationship_context(
            "partially implements auth module, only works in production, verified by E2E tests",
        );
        assert_eq!(ctx.scope, Some(ContextScope::Partial));
        assert_eq!(ctx.components, vec!["auth module"]);
        assert_eq!(ctx.conditions, vec!["production"]);
        assert_eq!(ctx.evidence, vec!["E2E tests"]);
        assert_eq!(ctx.temporal, None);
        assert!(ctx.exceptions.is_empty());
        assert!(ctx.text.starts_with("partially implements"));
    }

    #[test]
    fn test_scope_variants() {
        assert_eq!(
            extract_relationship_context("fully solves the issue").scope,
            Some(ContextScope::Full)
        );
        assert_eq!(
            extract_relationship_context("only works when retries are on").scope,
            Some(ContextScope::Conditional)
        );
        assert_eq!(
            extract_relationship_context("limited to small graphs").scope,
            Some(ContextScope::Limited)
        );
        assert_eq!(extract_relationship_context("plain note").scope, None);
    }

    #[test]
    fn test_temporal_extraction() {
        let ctx = extract_relationship_context("broken since v2.3, fixed as of 2024-06-01");
        assert_eq!(ctx.temporal.as_deref(), Some("v2.3"));
    }

    #[test]
    fn test_exceptions() {
        let ctx = extract_relationship_context("applies everywhere except windows builds");
        assert_eq!(ctx.exceptions, vec!["windows builds"]);
    }

    #[test]
    fn test_idempotent_on_structured_input() {
        let first = extract_relationship_context(
            "partially implements auth module, verified by E2E tests",
        );
        let json = serde_json::to_string(&first).unwrap();
        let second = extract_relationship_context(&json);
        assert_eq!(second, first);
    }

    #[test]
    fn test_never_fails_on_garbage() {
        for garbage in ["{not json", "}{", "\u{0}\u{1}", "   ", "{}"] {
            let _ctx = extract_relationship_context(garbage);
        }
    }

    #[test]
    fn test_json_shape() {
        let ctx = extract_relationship_context("partially implements auth module");
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["scope"], "partial");
        assert_eq!(value["components"][0], "auth module");
    }
}
