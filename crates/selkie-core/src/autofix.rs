#![forbid(unsafe_code)]

//! Automatic repair of common malformed diagram sources.
//!
//! The fixer holds an ordered rule list; each rule is a pure text transformation that
//! targets exactly one class of malformation and is a no-op when that malformation is
//! absent. Rules compose sequentially (each receives the previous rule's output),
//! which makes the whole pass idempotent by construction.

use crate::diagnostic::DiagnosticKind;
use crate::scan;

pub type FixFn = fn(&str) -> String;

/// One repair rule: a named, pure text-to-text transformation plus the diagnostic
/// kinds it addresses.
#[derive(Debug, Clone, Copy)]
pub struct FixRule {
    pub name: &'static str,
    pub targets: &'static [DiagnosticKind],
    apply: FixFn,
}

impl FixRule {
    pub const fn new(
        name: &'static str,
        targets: &'static [DiagnosticKind],
        apply: FixFn,
    ) -> Self {
        Self {
            name,
            targets,
            apply,
        }
    }

    pub fn apply(&self, source: &str) -> String {
        (self.apply)(source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixResult {
    pub code: String,
    pub has_changes: bool,
}

pub struct AutoFixer {
    rules: Vec<FixRule>,
}

impl Default for AutoFixer {
    fn default() -> Self {
        Self::with_rules(default_rules())
    }
}

impl AutoFixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a fixer with a custom rule list. Order matters: narrow rules belong
    /// before broad ones so one rule cannot mask another's target pattern, and the
    /// quote rule must run before the bracket rule (the bracket scan is quote-aware).
    pub fn with_rules(rules: Vec<FixRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[FixRule] {
        &self.rules
    }

    /// Whether any rule in the list targets `kind`.
    pub fn can_fix(&self, kind: DiagnosticKind) -> bool {
        self.rules.iter().any(|r| r.targets.contains(&kind))
    }

    /// Applies every rule in order, once. `has_changes` is true iff the final text
    /// differs from the input by at least one byte; when false, `code` is the input
    /// verbatim. "Nothing to fix" is a valid result, not an error.
    pub fn fix(&self, source: &str) -> FixResult {
        let mut code = source.to_string();
        for rule in &self.rules {
            code = rule.apply(&code);
        }
        let has_changes = code != source;
        if has_changes {
            tracing::debug!(rules = self.rules.len(), "auto-fix rewrote source");
        }
        FixResult { code, has_changes }
    }
}

/// The shipped rule set, most specific first.
pub fn default_rules() -> Vec<FixRule> {
    vec![
        FixRule::new(
            "normalize-diagram-keyword",
            &[DiagnosticKind::UnknownDiagramType],
            normalize_diagram_keyword,
        ),
        FixRule::new(
            "repair-flowchart-arrows",
            &[DiagnosticKind::ArrowTypo],
            repair_flowchart_arrows,
        ),
        FixRule::new(
            "close-unterminated-quotes",
            &[DiagnosticKind::UnterminatedQuote],
            close_unterminated_quotes,
        ),
        FixRule::new(
            "close-unterminated-brackets",
            &[DiagnosticKind::UnterminatedBracket],
            close_unterminated_brackets,
        ),
    ]
}

/// Rewrites a mistyped or mis-cased diagram keyword on the first content line to its
/// canonical spelling. Exact canonical keywords are left untouched.
fn normalize_diagram_keyword(source: &str) -> String {
    let mut done = false;
    scan::map_content_lines(source, |_, line| {
        if done {
            return None;
        }
        done = true;
        let word = line.split_whitespace().next()?;
        let canon = scan::canonical_keyword(word)?;
        if word == canon {
            return None;
        }
        let start = line.find(word)?;
        let mut fixed = String::with_capacity(line.len());
        fixed.push_str(&line[..start]);
        fixed.push_str(canon);
        fixed.push_str(&line[start + word.len()..]);
        Some(fixed)
    })
}

/// Rewrites bare `->` edges to `-->` in flowchart/graph sources only; in sequence
/// diagrams `->` is a valid solid line and must not be touched.
fn repair_flowchart_arrows(source: &str) -> String {
    let flowchart = scan::diagram_keyword(source)
        .as_deref()
        .is_some_and(scan::is_flowchart_keyword);
    if !flowchart {
        return source.to_string();
    }
    scan::map_content_lines(source, |_, line| {
        if scan::has_bare_arrow(line) {
            Some(widen_bare_arrows(line))
        } else {
            None
        }
    })
}

fn widen_bare_arrows(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 4);
    let mut in_quotes = false;
    let mut prev: Option<char> = None;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            in_quotes = !in_quotes;
        }
        if !in_quotes
            && c == '-'
            && chars.peek() == Some(&'>')
            && !matches!(prev, Some('-') | Some('.') | Some('<') | Some('='))
        {
            let mut ahead = chars.clone();
            ahead.next();
            if ahead.next() != Some('>') {
                chars.next();
                out.push_str("-->");
                prev = Some('>');
                continue;
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Appends a closing `"` to any content line with an odd number of quotes.
fn close_unterminated_quotes(source: &str) -> String {
    scan::map_content_lines(source, |_, line| {
        if scan::has_odd_quotes(line) {
            let mut fixed = line.to_string();
            fixed.push('"');
            Some(fixed)
        } else {
            None
        }
    })
}

/// Appends the matching closers for unclosed `[` `(` `{` at the end of each content
/// line. The least invasive repair: nothing is deleted or reordered, and unmatched
/// closers are left alone.
fn close_unterminated_brackets(source: &str) -> String {
    scan::map_content_lines(source, |_, line| {
        let closers = scan::closers_needed(line);
        if closers.is_empty() {
            None
        } else {
            let mut fixed = line.to_string();
            fixed.push_str(&closers);
            Some(fixed)
        }
    })
}
