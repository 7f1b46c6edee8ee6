//! Cursor-level text heuristics for completion and hover.
//!
//! Documents being edited rarely parse at the cursor, so these work on raw
//! lines instead of the AST.

use tower_lsp::lsp_types::Position;

// ── Context kind ──────────────────────────────────────────────────────────────

/// What the cursor is positioned inside, used to drive completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// Top level, or a capitalized word inside a block: an object type.
    Object,
    /// Inside a block, before any `:` on the line.
    Property { object: String },
    /// After `name:` on the line.
    Value { property: String },
    /// After `signal::`.
    Handler,
    /// Inside a comment or string.
    Unknown,
}

// ── word_at ───────────────────────────────────────────────────────────────────

/// The identifier containing or immediately preceding the cursor. Dots split
/// words, so hovering `b1` in `b1.label` yields `b1`.
pub fn word_at<'t>(text: &'t str, pos: &Position) -> Option<&'t str> {
    let line = text.lines().nth(pos.line as usize)?;
    let col = (pos.character as usize).min(line.len());
    if !line.is_char_boundary(col) {
        return None;
    }

    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let start = line[..col].rfind(|c: char| !is_word(c)).map(|i| i + 1).unwrap_or(0);
    let end = col + line[col..].find(|c: char| !is_word(c)).unwrap_or(line.len() - col);

    (start < end).then(|| &line[start..end])
}

// ── find_enclosing_object ─────────────────────────────────────────────────────

/// Walk backwards through `before` (text up to the cursor) counting braces to
/// find the nearest unclosed block, and return the name that opened it.
pub fn find_enclosing_object(before: &str) -> Option<String> {
    let mut depth: i32 = 0;

    for line in before.lines().rev() {
        let code = strip_comment(line.trim());
        for (i, ch) in code.char_indices().rev() {
            match ch {
                '}' => depth += 1,
                '{' => {
                    if depth == 0 {
                        return name_before(&code[..i]);
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
    }
    None
}

/// The last word of `s`: the name in `Button {` or `image: Image {`.
fn name_before(s: &str) -> Option<String> {
    let word = s.trim_end().rsplit(|c: char| c.is_whitespace() || c == ':' || c == ';').next()?;
    let word = word.rsplit('.').next()?;
    (!word.is_empty()).then(|| word.to_string())
}

// ── completion_context ────────────────────────────────────────────────────────

/// Classify the cursor position for completion.
pub fn completion_context(text: &str, pos: &Position) -> Context {
    let line_idx = pos.line as usize;
    let col = pos.character as usize;

    let current_line = text.lines().nth(line_idx).unwrap_or("");
    let before_cursor = current_line.get(..col.min(current_line.len())).unwrap_or("");
    if before_cursor.contains('#') || before_cursor.matches(['"', '\'']).count() % 2 == 1 {
        return Context::Unknown;
    }

    // only the statement the cursor is in
    let statement = before_cursor.rsplit(['{', ';']).next().unwrap_or("");

    if statement.contains("::") {
        return Context::Handler;
    }
    if let Some(colon_idx) = statement.rfind(':') {
        let property = statement[..colon_idx].trim().to_string();
        return Context::Value { property };
    }

    let before = text_before(text, line_idx, col);
    if brace_depth(&before) == 0 {
        return Context::Object;
    }

    let trimmed = statement.trim();
    if trimmed.starts_with(char::is_uppercase) {
        Context::Object
    } else {
        let object = find_enclosing_object(&before).unwrap_or_default();
        Context::Property { object }
    }
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn strip_comment(s: &str) -> &str {
    s.find('#').map(|i| &s[..i]).unwrap_or(s)
}

fn brace_depth(text: &str) -> i32 {
    text.lines().map(strip_comment).flat_map(str::chars).fold(0i32, |d, c| match c {
        '{' => d + 1,
        '}' => (d - 1).max(0),
        _ => d,
    })
}

/// The source text from the beginning of the file up to `(line, col)`.
fn text_before(text: &str, line_idx: usize, col: usize) -> String {
    let mut out = String::new();
    for (i, line) in text.lines().enumerate() {
        if i < line_idx {
            out.push_str(line);
            out.push('\n');
        } else if i == line_idx {
            out.push_str(line.get(..col.min(line.len())).unwrap_or(line));
            break;
        } else {
            break;
        }
    }
    out
}
