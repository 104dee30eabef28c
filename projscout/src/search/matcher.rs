use dashmap::DashMap;
use glob::{MatchOptions, Pattern};
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::errors::SearchError;

static PATTERN_CACHE: Lazy<DashMap<PatternKey, CompiledPattern>> = Lazy::new(DashMap::new);

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// How raw user text is turned into a whole-string glob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapStyle {
    /// `*text*`: the text may appear anywhere in the candidate
    Contains,
    /// The text must match the whole candidate
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PatternKey {
    text: String,
    match_case: bool,
    wrap: WrapStyle,
}

/// Strategy for pattern matching
#[derive(Debug, Clone)]
enum MatchStrategy {
    Glob(Arc<Pattern>),
    /// Used only if the glob crate refuses the sanitised text
    Literal { text: Arc<str>, wrap: WrapStyle },
}

/// A read-only glob matcher for file names or content lines.
///
/// When compiled without `match_case`, the pattern text was lower-cased at
/// compile time and every candidate is lower-cased before the comparison.
/// Both sides go through `str::to_lowercase`; no case-insensitive matcher
/// option is involved.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    match_case: bool,
    strategy: MatchStrategy,
}

/// Compiles raw dialog text into a matcher.
///
/// Returns `None` for empty or whitespace-only text, meaning that axis of
/// the query is unconstrained. Compilation never fails: `*` and `?` in the
/// text stay wildcards, `[` and `]` are matched literally.
pub fn compile(raw_text: &str, match_case: bool, wrap: WrapStyle) -> Option<CompiledPattern> {
    if raw_text.trim().is_empty() {
        return None;
    }

    let key = PatternKey {
        text: raw_text.to_string(),
        match_case,
        wrap,
    };
    if let Some(entry) = PATTERN_CACHE.get(&key) {
        return Some(entry.clone());
    }

    let folded = if match_case {
        raw_text.to_string()
    } else {
        raw_text.to_lowercase()
    };
    let glob_text = to_glob(&folded, wrap);

    let strategy = match Pattern::new(&glob_text) {
        Ok(pattern) => MatchStrategy::Glob(Arc::new(pattern)),
        Err(e) => {
            let err = SearchError::invalid_pattern(format!("{}: {}", glob_text, e));
            warn!("{}; falling back to literal matching", err);
            MatchStrategy::Literal {
                text: Arc::from(folded.as_str()),
                wrap,
            }
        }
    };
    trace!("Compiled '{}' as {:?}", raw_text, strategy);

    let compiled = CompiledPattern {
        source: raw_text.to_string(),
        match_case,
        strategy,
    };
    PATTERN_CACHE.insert(key, compiled.clone());
    Some(compiled)
}

/// Builds glob text the `glob` crate always accepts.
///
/// Brackets become the escaped forms `[[]` and `[]]`. Runs of `*` collapse
/// to one, because `**` is only legal as a whole path component.
fn to_glob(text: &str, wrap: WrapStyle) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    if wrap == WrapStyle::Contains {
        out.push('*');
    }
    for c in text.chars() {
        match c {
            '[' => out.push_str("[[]"),
            ']' => out.push_str("[]]"),
            '*' if out.ends_with('*') => {}
            c => out.push(c),
        }
    }
    if wrap == WrapStyle::Contains && !out.ends_with('*') {
        out.push('*');
    }
    out
}

impl CompiledPattern {
    /// Tests a candidate file name or line, applying the same case folding
    /// the pattern was compiled with.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = self.fold(candidate);
        match &self.strategy {
            MatchStrategy::Glob(pattern) => pattern.matches_with(&candidate, GLOB_OPTIONS),
            MatchStrategy::Literal { text, wrap } => match wrap {
                WrapStyle::Contains => candidate.contains(&**text),
                WrapStyle::Exact => *candidate == **text,
            },
        }
    }

    /// The case transformation applied to candidates
    pub fn fold<'a>(&self, candidate: &'a str) -> Cow<'a, str> {
        if self.match_case {
            Cow::Borrowed(candidate)
        } else {
            Cow::Owned(candidate.to_lowercase())
        }
    }

    /// The raw text this pattern was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn match_case(&self) -> bool {
        self.match_case
    }

    /// The glob text actually used for matching
    pub fn glob_text(&self) -> &str {
        match &self.strategy {
            MatchStrategy::Glob(pattern) => pattern.as_str(),
            MatchStrategy::Literal { text, .. } => &**text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_no_pattern() {
        assert!(compile("", false, WrapStyle::Contains).is_none());
        assert!(compile("   \t", true, WrapStyle::Contains).is_none());
    }

    #[test]
    fn test_contains_is_substring_glob() {
        let p = compile("hello", true, WrapStyle::Contains).unwrap();
        assert_eq!(p.glob_text(), "*hello*");
        assert!(p.matches("say hello there"));
        assert!(p.matches("hello"));
        assert!(!p.matches("help"));
    }

    #[test]
    fn test_case_insensitive_folds_both_sides() {
        let p = compile("HeLLo", false, WrapStyle::Contains).unwrap();
        assert_eq!(p.glob_text(), "*hello*");
        assert!(p.matches("Hello World"));
        assert!(p.matches("HELLO"));

        let p = compile("hello", true, WrapStyle::Contains).unwrap();
        assert!(!p.matches("Hello World"));
    }

    #[test]
    fn test_unicode_case_folding_uses_to_lowercase() {
        let p = compile("ÄPFEL", false, WrapStyle::Contains).unwrap();
        assert!(p.matches("grüne äpfel"));
        assert!(p.matches("GRÜNE ÄPFEL"));
    }

    #[test]
    fn test_user_wildcards_are_kept() {
        let p = compile("*.java", false, WrapStyle::Contains).unwrap();
        assert_eq!(p.glob_text(), "*.java*");
        assert!(p.matches("A.java"));
        assert!(!p.matches("B.txt"));

        let p = compile("f?o", true, WrapStyle::Contains).unwrap();
        assert!(p.matches("xfaoy"));
        assert!(!p.matches("fo"));
    }

    #[test]
    fn test_exact_wrap() {
        let p = compile("*.java", false, WrapStyle::Exact).unwrap();
        assert!(p.matches("A.java"));
        assert!(!p.matches("A.javax"));
        assert!(!p.matches("A.java.txt"));
    }

    #[test]
    fn test_brackets_are_literal() {
        let p = compile("vec[0]", true, WrapStyle::Contains).unwrap();
        assert!(p.matches("let x = vec[0];"));
        assert!(!p.matches("let x = vec0;"));

        let p = compile("[unclosed", true, WrapStyle::Contains).unwrap();
        assert!(p.matches("a [unclosed bracket"));
    }

    #[test]
    fn test_star_runs_collapse() {
        let p = compile("a***b", true, WrapStyle::Contains).unwrap();
        assert_eq!(p.glob_text(), "*a*b*");
        assert!(p.matches("xaZZZbx"));

        let p = compile("**", true, WrapStyle::Exact).unwrap();
        assert_eq!(p.glob_text(), "*");
        assert!(p.matches("anything"));
    }

    #[test]
    fn test_separators_are_not_special() {
        let p = compile("a/b", true, WrapStyle::Contains).unwrap();
        assert!(p.matches("path a/b/c"));
        let p = compile("a*c", true, WrapStyle::Contains).unwrap();
        assert!(p.matches("a/b/c"));
    }

    #[test]
    fn test_reflexive_on_awkward_inputs() {
        let inputs = [
            "plain",
            "Mixed Case",
            "*",
            "?",
            "a*b?c",
            "[x]",
            "]]",
            "[!neg]",
            "**/deep/**",
            "tab\there",
            "ümlaut ÄÖÜ",
            "-",
            "{braces}",
        ];
        for input in inputs {
            for match_case in [true, false] {
                for wrap in [WrapStyle::Contains, WrapStyle::Exact] {
                    let p = compile(input, match_case, wrap).unwrap();
                    assert!(
                        p.matches(input),
                        "{:?} (case={}, wrap={:?}) should match itself via {}",
                        input,
                        match_case,
                        wrap,
                        p.glob_text()
                    );
                }
            }
        }
    }

    #[test]
    fn test_pattern_caching() {
        let unique = format!(
            "cache_probe_{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );

        let first = compile(&unique, false, WrapStyle::Contains).unwrap();
        let second = compile(&unique, false, WrapStyle::Contains).unwrap();
        match (&first.strategy, &second.strategy) {
            (MatchStrategy::Glob(a), MatchStrategy::Glob(b)) => assert!(Arc::ptr_eq(a, b)),
            other => panic!("unexpected strategies {:?}", other),
        }

        // A different case setting is a different entry
        let third = compile(&unique, true, WrapStyle::Contains).unwrap();
        match (&first.strategy, &third.strategy) {
            (MatchStrategy::Glob(a), MatchStrategy::Glob(b)) => assert!(!Arc::ptr_eq(a, b)),
            other => panic!("unexpected strategies {:?}", other),
        }
    }

    #[test]
    fn test_literal_fallback_matching() {
        let p = CompiledPattern {
            source: "Needle".to_string(),
            match_case: false,
            strategy: MatchStrategy::Literal {
                text: Arc::from("needle"),
                wrap: WrapStyle::Contains,
            },
        };
        assert!(p.matches("hay NEEDLE stack"));
        assert!(!p.matches("hay stack"));
    }
}
