#![forbid(unsafe_code)]

//! Classification of rendering-engine failures into structured, actionable
//! diagnostics.
//!
//! The engine's raw message is matched against a table of known patterns, in the same
//! registry style as a detector table; when nothing matches, the source text itself is
//! probed for the malformations the auto-fixer knows how to repair. Classification is
//! total: every failure yields a [`Diagnostic`], in the worst case an
//! [`DiagnosticKind::Unrecognized`] one that preserves the raw message.

use crate::engine::EngineFailure;
use crate::scan;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    UnknownDiagramType,
    UnterminatedBracket,
    UnterminatedQuote,
    ArrowTypo,
    UndeclaredNode,
    Unrecognized,
}

/// One classified render failure.
///
/// Immutable; produced exactly once per failed render attempt. `message` and
/// `suggestion` are human-oriented and distinct from `raw_message`, which is the
/// engine's report verbatim. `line`/`column` are 1-based, best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub raw_message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message: String,
    pub suggestion: Option<String>,
    pub auto_fixable: bool,
}

struct MessageRule {
    kind: DiagnosticKind,
    pattern: Regex,
}

pub struct Classifier {
    rules: Vec<MessageRule>,
    line_re: Regex,
    column_re: Regex,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        let mut rules = Vec::new();
        let mut add = |kind, pattern: &str| {
            rules.push(MessageRule {
                kind,
                pattern: Regex::new(pattern).unwrap(),
            });
        };

        // Ordered most specific first; the quote pattern must come before the generic
        // "unterminated" bracket pattern.
        add(
            DiagnosticKind::UnknownDiagramType,
            r"(?i)no diagram type detected|unknown diagram|unsupported diagram",
        );
        add(
            DiagnosticKind::UnterminatedQuote,
            r"(?i)unterminated (?:string|quote)|unclosed quote",
        );
        add(
            DiagnosticKind::UnterminatedBracket,
            r#"(?i)unterminated|unclosed|missing closing|expecting ['"]?[\])}]"#,
        );
        add(
            DiagnosticKind::ArrowTypo,
            r#"(?i)invalid arrow|expecting ['"]?--|got ['"]?->"#,
        );
        add(
            DiagnosticKind::UndeclaredNode,
            r"(?i)undeclared|not (?:been )?declared|unknown (?:node|participant|actor)",
        );

        Self {
            rules,
            line_re: Regex::new(r"(?i)line\s+(\d+)").unwrap(),
            column_re: Regex::new(r"(?i)col(?:umn)?\s+(\d+)").unwrap(),
        }
    }

    /// Classifies a render failure against `source`. Deterministic and total: never
    /// panics, never returns an error.
    pub fn classify(&self, failure: &EngineFailure, source: &str) -> Diagnostic {
        let from_message = self
            .rules
            .iter()
            .find(|r| r.pattern.is_match(&failure.message))
            .map(|r| r.kind);

        let probed = if from_message.is_none() {
            probe_source(source)
        } else {
            None
        };

        let kind = from_message
            .or(probed.map(|(kind, _)| kind))
            .unwrap_or(DiagnosticKind::Unrecognized);

        let line = failure
            .line
            .or_else(|| self.capture_u32(&self.line_re, &failure.message))
            .or(probed.and_then(|(_, line)| line));
        let column = failure
            .column
            .or_else(|| self.capture_u32(&self.column_re, &failure.message));

        let (message, suggestion, auto_fixable) = describe(kind, source);

        Diagnostic {
            kind,
            raw_message: failure.message.clone(),
            line,
            column,
            message,
            suggestion,
            auto_fixable,
        }
    }

    fn capture_u32(&self, re: &Regex, text: &str) -> Option<u32> {
        re.captures(text)?.get(1)?.as_str().parse().ok()
    }
}

/// Scans the source for the malformations the fix rules target. Returns the kind plus
/// the 1-based line it was found on, when the raw message gave us nothing to go on.
fn probe_source(source: &str) -> Option<(DiagnosticKind, Option<u32>)> {
    let mut found: Option<(DiagnosticKind, Option<u32>)> = None;
    let flowchart = scan::diagram_keyword(source)
        .as_deref()
        .is_some_and(scan::is_flowchart_keyword);

    scan::map_content_lines(source, |no, line| {
        if found.is_none() {
            if scan::has_odd_quotes(line) {
                found = Some((DiagnosticKind::UnterminatedQuote, Some(no as u32)));
            } else if !scan::closers_needed(line).is_empty() {
                found = Some((DiagnosticKind::UnterminatedBracket, Some(no as u32)));
            } else if flowchart && scan::has_bare_arrow(line) {
                found = Some((DiagnosticKind::ArrowTypo, Some(no as u32)));
            }
        }
        None
    });

    found.or_else(|| {
        // A present but unrecognizable keyword is the other classic first-line mistake.
        let keyword = scan::diagram_keyword(source)?;
        if scan::canonical_keyword(&keyword).is_none() {
            Some((DiagnosticKind::UnknownDiagramType, Some(1)))
        } else {
            None
        }
    })
}

fn describe(kind: DiagnosticKind, source: &str) -> (String, Option<String>, bool) {
    match kind {
        DiagnosticKind::UnknownDiagramType => {
            let canon = scan::diagram_keyword(source)
                .as_deref()
                .and_then(scan::canonical_keyword);
            let suggestion = match canon {
                Some(canon) => format!("Did you mean `{canon}`?"),
                None => "Start the diagram with a known type keyword, e.g. `flowchart LR` \
                         or `sequenceDiagram`."
                    .to_string(),
            };
            // Only fixable when the keyword rule can actually map the typo.
            (
                "The first line does not name a known diagram type.".to_string(),
                Some(suggestion),
                canon.is_some(),
            )
        }
        DiagnosticKind::UnterminatedBracket => (
            "A node shape is opened but never closed on this line.".to_string(),
            Some("Add the matching closing bracket, e.g. `A[Label]` instead of `A[Label`.".into()),
            true,
        ),
        DiagnosticKind::UnterminatedQuote => (
            "A quoted label is missing its closing quote.".to_string(),
            Some("Close the label with a `\"`.".into()),
            true,
        ),
        DiagnosticKind::ArrowTypo => (
            "`->` is not a valid flowchart edge.".to_string(),
            Some("Use `-->` for a directed edge.".into()),
            true,
        ),
        DiagnosticKind::UndeclaredNode => (
            "A statement references a node that was never declared.".to_string(),
            Some("Declare the node before referring to it.".into()),
            false,
        ),
        DiagnosticKind::Unrecognized => (
            "The diagram could not be rendered.".to_string(),
            None,
            false,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: &str, source: &str) -> Diagnostic {
        Classifier::new().classify(&EngineFailure::new(message), source)
    }

    #[test]
    fn unknown_type_from_message() {
        let d = classify(
            "No diagram type detected matching given configuration for text: flowchat LR",
            "flowchat LR\nA-->B",
        );
        assert_eq!(d.kind, DiagnosticKind::UnknownDiagramType);
        assert!(d.auto_fixable);
        assert_eq!(d.suggestion.as_deref(), Some("Did you mean `flowchart`?"));
    }

    #[test]
    fn position_parsed_from_message_text() {
        let d = classify("Parse error on line 2: ...", "flowchart LR\nA[Open-->B");
        assert_eq!(d.line, Some(2));
        assert_eq!(d.column, None);
    }

    #[test]
    fn structured_position_wins_over_message() {
        let failure = EngineFailure::at("Parse error on line 9", 2, Some(7));
        let d = Classifier::new().classify(&failure, "flowchart LR\nA[Open-->B");
        assert_eq!(d.line, Some(2));
        assert_eq!(d.column, Some(7));
    }

    #[test]
    fn source_probe_finds_unterminated_bracket() {
        let d = classify("syntax error", "flowchart LR\nA[Open-->B");
        assert_eq!(d.kind, DiagnosticKind::UnterminatedBracket);
        assert_eq!(d.line, Some(2));
        assert!(d.auto_fixable);
    }

    #[test]
    fn source_probe_finds_bare_arrow_only_in_flowcharts() {
        let d = classify("syntax error", "flowchart LR\nA->B");
        assert_eq!(d.kind, DiagnosticKind::ArrowTypo);

        let d = classify("syntax error", "sequenceDiagram\nA->B: hi");
        assert_eq!(d.kind, DiagnosticKind::Unrecognized);
    }

    #[test]
    fn unrecognized_preserves_raw_message() {
        let d = classify("kaboom", "flowchart LR\nA-->B");
        assert_eq!(d.kind, DiagnosticKind::Unrecognized);
        assert!(!d.auto_fixable);
        assert_eq!(d.suggestion, None);
        assert_eq!(d.raw_message, "kaboom");
    }

    #[test]
    fn undeclared_node_is_not_auto_fixable() {
        let d = classify(
            "unknown participant 'Bob' on line 3",
            "sequenceDiagram\nAlice->>Bob: hi",
        );
        assert_eq!(d.kind, DiagnosticKind::UndeclaredNode);
        assert!(!d.auto_fixable);
        assert_eq!(d.line, Some(3));
    }
}
