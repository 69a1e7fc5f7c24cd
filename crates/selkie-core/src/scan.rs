#![forbid(unsafe_code)]

//! Line-level scanning helpers shared by the classifier and the fix rules.
//!
//! These are deliberately shallow: they know just enough about the diagram syntax to
//! spot the malformations the auto-fixer targets, and nothing more. Front-matter
//! blocks (`---` fenced, Mermaid-style) and `%%` comment/directive lines are never
//! treated as diagram content.

/// Tracks whether the walker is before, inside, or past a leading front-matter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrontMatter {
    Start,
    Inside,
    Done,
}

/// Walks `source` line by line, calling `f(line_no, line)` for every content line
/// (1-based numbering; front-matter, `%%` lines and blank lines are skipped). When `f`
/// returns `Some`, the replacement is spliced in; line terminators are preserved
/// byte-for-byte so an all-`None` walk reproduces the input exactly.
pub(crate) fn map_content_lines(
    source: &str,
    mut f: impl FnMut(usize, &str) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(source.len() + 8);
    let mut fm = FrontMatter::Start;
    let mut line_no = 0usize;

    for raw in source.split_inclusive('\n') {
        line_no += 1;
        let body_len = raw.trim_end_matches(['\n', '\r']).len();
        let (body, term) = raw.split_at(body_len);
        let trimmed = body.trim();

        let is_content = match fm {
            FrontMatter::Start => {
                if trimmed.is_empty() {
                    false
                } else if trimmed == "---" {
                    fm = FrontMatter::Inside;
                    false
                } else {
                    fm = FrontMatter::Done;
                    !trimmed.starts_with("%%")
                }
            }
            FrontMatter::Inside => {
                if trimmed == "---" {
                    fm = FrontMatter::Done;
                }
                false
            }
            FrontMatter::Done => !trimmed.is_empty() && !trimmed.starts_with("%%"),
        };

        match if is_content { f(line_no, body) } else { None } {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(body),
        }
        out.push_str(term);
    }
    out
}

/// First whitespace-delimited token of the first content line, i.e. the diagram type
/// keyword position.
pub(crate) fn diagram_keyword(source: &str) -> Option<String> {
    let mut keyword = None;
    map_content_lines(source, |_, line| {
        if keyword.is_none() {
            keyword = line.split_whitespace().next().map(str::to_string);
        }
        None
    });
    keyword
}

/// Maps a (possibly mistyped) diagram keyword onto its canonical spelling. Exact
/// canonical spellings map to themselves, which makes rewrite rules no-ops on valid
/// input.
pub(crate) fn canonical_keyword(word: &str) -> Option<&'static str> {
    let lower = word.to_ascii_lowercase();
    let canon = match lower.as_str() {
        "flowchart" | "flowchar" | "flowchat" | "flowcart" | "flwochart" => "flowchart",
        "graph" | "grpah" => "graph",
        "sequencediagram" | "sequence-diagram" | "sequencedigram" => "sequenceDiagram",
        "classdiagram" | "class-diagram" => "classDiagram",
        "statediagram" => "stateDiagram",
        "statediagram-v2" => "stateDiagram-v2",
        "erdiagram" | "er-diagram" => "erDiagram",
        "gantt" | "gannt" => "gantt",
        "pie" => "pie",
        "journey" => "journey",
        "mindmap" => "mindmap",
        "timeline" => "timeline",
        "gitgraph" => "gitGraph",
        "quadrantchart" => "quadrantChart",
        _ => return None,
    };
    Some(canon)
}

/// True when the keyword selects the flowchart grammar (where `->` is a typo; in
/// sequence diagrams it is a valid solid line).
pub(crate) fn is_flowchart_keyword(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "flowchart" | "graph" | "flowchart-elk"
    )
}

/// Closing delimiters (innermost first) needed to balance the unclosed `[` `(` `{`
/// openers on this line. Delimiters inside double quotes do not count; unmatched
/// closers are ignored rather than "repaired".
pub(crate) fn closers_needed(line: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '[' => stack.push(']'),
            '(' => stack.push(')'),
            '{' => stack.push('}'),
            ']' | ')' | '}' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }
    stack.into_iter().rev().collect()
}

pub(crate) fn has_odd_quotes(line: &str) -> bool {
    line.chars().filter(|&c| c == '"').count() % 2 == 1
}

/// Detects a bare `->` outside quotes that is not part of a longer, valid arrow token
/// (`-->`, `->>`, `-.->`, `<->`, `==>` never match).
pub(crate) fn has_bare_arrow(line: &str) -> bool {
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
                return true;
            }
        }
        prev = Some(c);
    }
    false
}
