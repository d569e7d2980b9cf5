use once_cell::sync::Lazy;
use regex::Regex;

static HTML_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<!--.*?-->").expect("valid regex"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?>").expect("valid regex")
});
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!?\[([^\[\]]*)\]\([^()]*\)").expect("valid regex"));
static STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~([^~]*)~~").expect("valid regex"));

const FENCE: &str = "```";

/// Rewrites markdown into the dialect the editor's live renderer accepts.
///
/// Outside fenced code: inline HTML, links and strikethrough become plain
/// text, table rows become `- a: b` bullets, rules disappear, headings are
/// clamped to levels 2..=3. Blank lines are normalised so that headings,
/// list blocks and fences are separated by exactly one blank line and no
/// run of blank lines survives. Fenced code is kept verbatim apart from the
/// language tag and collapsed blank runs. The result is stable under a
/// second pass.
pub fn sanitize(markdown: &str) -> String {
    layout(classify(markdown))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Blank,
    Text(String),
    Heading(String),
    Item(String),
    FenceOpen,
    FenceClose,
    Code(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Heading,
    Item,
    FenceOpen,
    FenceClose,
    Code,
}

fn classify(markdown: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut in_fence = false;

    for raw in markdown.lines() {
        if in_fence {
            if raw.trim_start().starts_with(FENCE) {
                in_fence = false;
                lines.push(Line::FenceClose);
            } else {
                lines.push(Line::Code(raw.to_string()));
            }
            continue;
        }

        let stripped = strip_inline(raw);
        let trimmed = stripped.trim();

        if trimmed.starts_with(FENCE) {
            in_fence = true;
            lines.push(Line::FenceOpen);
        } else if trimmed.is_empty() {
            lines.push(Line::Blank);
        } else if trimmed.starts_with('|') {
            // Divider rows and rows without content vanish without a trace so
            // the remaining rows stay one contiguous list.
            if let Some(item) = table_row_to_item(trimmed) {
                lines.push(Line::Item(item));
            }
        } else if is_rule(trimmed) {
            lines.push(Line::Blank);
        } else if let Some(heading) = clamp_heading(&stripped) {
            lines.push(Line::Heading(heading));
        } else if is_list_item(&stripped) {
            lines.push(Line::Item(stripped));
        } else {
            lines.push(Line::Text(stripped));
        }
    }

    lines
}

fn layout(lines: Vec<Line>) -> String {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut prev: Option<Kind> = None;
    let mut pending_blank = false;
    let mut prev_code_blank = false;

    for line in lines {
        let (kind, text) = match line {
            Line::Blank => {
                pending_blank = true;
                continue;
            }
            Line::Code(code) => {
                let blank = code.trim().is_empty();
                if blank && prev_code_blank {
                    continue;
                }
                prev_code_blank = blank;
                out.push(code);
                prev = Some(Kind::Code);
                continue;
            }
            Line::Text(text) => (Kind::Text, text),
            Line::Heading(text) => (Kind::Heading, text),
            Line::Item(text) => (Kind::Item, text),
            Line::FenceOpen => (Kind::FenceOpen, FENCE.to_string()),
            Line::FenceClose => (Kind::FenceClose, FENCE.to_string()),
        };

        let needs_blank = match (prev, kind) {
            (None, _) => false,
            (Some(_), Kind::FenceClose) => false,
            (Some(Kind::FenceClose), _) => true,
            (Some(_), Kind::Heading | Kind::FenceOpen) => true,
            (Some(Kind::Item), Kind::Item) => false,
            (Some(_), Kind::Item) => true,
            _ => pending_blank,
        };
        if needs_blank {
            out.push(String::new());
        }

        out.push(text);
        prev = Some(kind);
        pending_blank = false;
        prev_code_blank = false;
    }

    // Only an unterminated fence can leave blank lines at the end.
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// Every replacement shortens the line, so the loop reaches a fixpoint.
fn strip_inline(line: &str) -> String {
    let mut current = line.to_string();
    loop {
        let next = HTML_COMMENT.replace_all(&current, "").into_owned();
        let next = HTML_TAG.replace_all(&next, "").into_owned();
        let next = LINK.replace_all(&next, "${1}").into_owned();
        let next = STRIKE.replace_all(&next, "${1}").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn table_row_to_item(trimmed: &str) -> Option<String> {
    let is_divider = trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':') || c.is_whitespace());
    if is_divider {
        return None;
    }

    let cells: Vec<&str> = trimmed
        .trim_matches('|')
        .split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect();
    if cells.is_empty() {
        None
    } else {
        Some(format!("- {}", cells.join(": ")))
    }
}

fn is_rule(trimmed: &str) -> bool {
    let mut marks = trimmed.chars().filter(|c| !c.is_whitespace());
    let Some(first) = marks.next() else {
        return false;
    };
    if !matches!(first, '-' | '*' | '_') {
        return false;
    }
    let mut count = 1;
    for c in marks {
        if c != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

fn clamp_heading(line: &str) -> Option<String> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 {
        return None;
    }
    let rest = &line[hashes..];
    if !(rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        return None;
    }
    let level = hashes.clamp(2, 3);
    Some(format!("{}{}", "#".repeat(level), rest))
}

fn is_list_item(line: &str) -> bool {
    let t = line.trim_start();
    if t.starts_with("- ") || t.starts_with("* ") || t.starts_with("+ ") {
        return true;
    }
    let digits = t.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && (t[digits..].starts_with(". ") || t[digits..].starts_with(") "))
}

#[cfg(test)]
mod tests {
    use super::{clamp_heading, is_list_item, is_rule, strip_inline, table_row_to_item};

    #[test]
    fn strip_inline_reaches_fixpoint_on_nested_markup() {
        assert_eq!(strip_inline("<<b>i>x</i>"), "x");
        assert_eq!(strip_inline("[[a](b)](c)"), "a");
        assert_eq!(strip_inline("~~gone~~ kept"), "gone kept");
        assert_eq!(strip_inline("a <!-- note --> b"), "a  b");
    }

    #[test]
    fn strip_inline_keeps_comparisons() {
        assert_eq!(strip_inline("1 < 2 and 3 > 2"), "1 < 2 and 3 > 2");
    }

    #[test]
    fn table_rows() {
        assert_eq!(table_row_to_item("| a | b |").as_deref(), Some("- a: b"));
        assert_eq!(table_row_to_item("|---|:---:|"), None);
        assert_eq!(table_row_to_item("| | |"), None);
        assert_eq!(table_row_to_item("| | x |").as_deref(), Some("- x"));
    }

    #[test]
    fn rules() {
        assert!(is_rule("---"));
        assert!(is_rule("* * *"));
        assert!(is_rule("____"));
        assert!(!is_rule("--"));
        assert!(!is_rule("-*-"));
        assert!(!is_rule("- item"));
    }

    #[test]
    fn headings_are_clamped() {
        assert_eq!(clamp_heading("# A").as_deref(), Some("## A"));
        assert_eq!(clamp_heading("## A").as_deref(), Some("## A"));
        assert_eq!(clamp_heading("###### A").as_deref(), Some("### A"));
        assert_eq!(clamp_heading("#tag"), None);
    }

    #[test]
    fn list_items() {
        assert!(is_list_item("- a"));
        assert!(is_list_item("  * a"));
        assert!(is_list_item("12. a"));
        assert!(!is_list_item("-a"));
        assert!(!is_list_item("2024 was a year"));
    }
}
