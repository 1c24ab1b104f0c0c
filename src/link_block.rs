//! Machine-owned link sections inside human-edited text.
//!
//! A task description, a PR body, or a text custom field may carry a block
//! of link entries that this tool maintains. [`upsert`] inserts or replaces
//! one entry in that block and leaves everything around it alone, so running
//! the same link command twice produces byte-identical output.
//!
//! # Block styles
//!
//! - [`BlockStyle::Headed`]: a header marker followed by a run of non-blank
//!   bullet lines, ended by the first blank line. Used in task descriptions.
//! - [`BlockStyle::Fenced`]: an HTML comment pair, so the block survives any
//!   surrounding markdown. Used in PR bodies.
//! - [`BlockStyle::Bare`]: the whole text is the block, one entry per line.
//!   Used for text custom fields.

/// Header written above the links block in task descriptions.
pub const DESCRIPTION_HEADER: &str = "**GitHub** _(clickup-cli)_";

/// Markers delimiting the block written into PR bodies.
pub const PR_BLOCK_START: &str = "<!-- clickup-cli:start -->";
pub const PR_BLOCK_END: &str = "<!-- clickup-cli:end -->";

/// Title line rendered inside the PR body block.
pub const PR_BLOCK_TITLE: &str = "## ClickUp";

/// One link line and the key that identifies what it links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    prefix: String,
    line: String,
}

impl LinkEntry {
    /// Newlines in `line` are collapsed to spaces so an entry always
    /// occupies exactly one line.
    pub fn new(prefix: impl Into<String>, line: impl Into<String>) -> Self {
        let line: String = line.into();
        Self {
            prefix: prefix.into(),
            line: collapse_newlines(&line),
        }
    }

    pub fn pull_request(repo: &str, number: u64, title: &str, url: &str) -> Self {
        Self::new(
            format!("{}#{}", repo, number),
            format!("[{}#{} — {}]({})", repo, number, title, url),
        )
    }

    pub fn branch(branch: &str, repo: &str) -> Self {
        let key = format!("`{}` in {}", branch, repo);
        Self::new(key.clone(), format!("Branch: {}", key))
    }

    pub fn commit(short_sha: &str, subject: &str, url: &str) -> Self {
        Self::new(
            format!("`{}`", short_sha),
            format!("Commit: [`{}`]({}) - {}", short_sha, url, subject),
        )
    }

    /// Entry describing a task inside a PR body.
    pub fn task(task_url: &str, name: &str, status: &str) -> Self {
        Self::new(task_url, format!("[{}]({}) · {}", name, task_url, status))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}

fn collapse_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(&['\n', '\r'][..], " ")
}

/// How a managed block is delimited and how entries inside it are keyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockStyle {
    Headed {
        header: String,
    },
    Fenced {
        start: String,
        end: String,
        title: Option<String>,
    },
    Bare,
}

impl BlockStyle {
    pub fn description_links() -> Self {
        BlockStyle::Headed {
            header: DESCRIPTION_HEADER.to_string(),
        }
    }

    pub fn pull_request_body() -> Self {
        BlockStyle::Fenced {
            start: PR_BLOCK_START.to_string(),
            end: PR_BLOCK_END.to_string(),
            title: Some(PR_BLOCK_TITLE.to_string()),
        }
    }

    /// An empty prefix matches every entry, so an unkeyed upsert replaces
    /// the first one instead of growing the block.
    fn matches(&self, existing: &str, prefix: &str) -> bool {
        if prefix.is_empty() {
            return true;
        }
        match self {
            BlockStyle::Bare => starts_with_key(existing, prefix),
            BlockStyle::Headed { .. } | BlockStyle::Fenced { .. } => {
                contains_at_boundary(existing, prefix)
            }
        }
    }
}

/// Characters that continue an identifier such as `repo#42` or a branch name.
fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/')
}

/// Containment check that refuses partial-token hits, so `repo#4` does not
/// match a line about `repo#42`.
fn contains_at_boundary(haystack: &str, needle: &str) -> bool {
    let first = needle.chars().next();
    let last = needle.chars().last();

    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();

        let left_ok = match (before, first) {
            (Some(b), Some(f)) => !(is_token_char(b) && is_token_char(f)),
            _ => true,
        };
        let right_ok = match (after, last) {
            (Some(a), Some(l)) => !(is_token_char(a) && is_token_char(l)),
            _ => true,
        };
        left_ok && right_ok
    })
}

/// Prefix check for bare lines. A leading `Label: ` and an opening `[` are
/// skipped, so `Commit: [`abc`](..)` is keyed by `` `abc` ``.
fn starts_with_key(line: &str, prefix: &str) -> bool {
    let mut rest = line;
    if let Some((label, tail)) = rest.split_once(": ") {
        if !label.is_empty() && label.chars().all(char::is_alphabetic) {
            rest = tail;
        }
    }
    let rest = rest.strip_prefix('[').unwrap_or(rest);

    [line, rest].iter().any(|candidate| {
        candidate.strip_prefix(prefix).is_some_and(|after| {
            match (after.chars().next(), prefix.chars().last()) {
                (Some(a), Some(l)) => !(is_token_char(a) && is_token_char(l)),
                _ => true,
            }
        })
    })
}

/// A document split around its managed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock<'a> {
    pub before: &'a str,
    pub entries: Vec<String>,
    pub after: &'a str,
    pub found: bool,
}

/// Locate the managed block in `document` and split it into entries.
pub fn parse_block<'a>(style: &BlockStyle, document: &'a str) -> ParsedBlock<'a> {
    match style {
        BlockStyle::Headed { header } => parse_headed(header, document),
        BlockStyle::Fenced { start, end, title } => {
            parse_fenced(start, end, title.as_deref(), document)
        }
        BlockStyle::Bare => {
            let entries: Vec<String> = document
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            ParsedBlock {
                before: "",
                found: !entries.is_empty(),
                entries,
                after: "",
            }
        }
    }
}

fn not_found(document: &str) -> ParsedBlock<'_> {
    ParsedBlock {
        before: "",
        entries: Vec::new(),
        after: document,
        found: false,
    }
}

fn strip_bullet(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix("- ") {
        rest
    } else if let Some(rest) = line.strip_prefix("* ") {
        rest.trim_start_matches(' ')
    } else {
        line
    }
}

fn parse_headed<'a>(header: &str, document: &'a str) -> ParsedBlock<'a> {
    let Some(header_at) = document.find(header) else {
        return not_found(document);
    };

    let body_start = header_at + header.len();
    let body = &document[body_start..];

    // Leading blank lines are skipped; the first blank line after an entry
    // ends the block and is consumed with it.
    let mut entries = Vec::new();
    let mut consumed = 0;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim();
        consumed += line.len();
        if trimmed.is_empty() {
            if !entries.is_empty() {
                break;
            }
            continue;
        }
        entries.push(strip_bullet(trimmed).to_string());
    }

    ParsedBlock {
        before: &document[..header_at],
        entries,
        after: &document[body_start + consumed..],
        found: true,
    }
}

fn parse_fenced<'a>(
    start: &str,
    end: &str,
    title: Option<&str>,
    document: &'a str,
) -> ParsedBlock<'a> {
    let Some(start_at) = document.find(start) else {
        return not_found(document);
    };
    let inner_start = start_at + start.len();
    let Some(end_offset) = document[inner_start..].find(end) else {
        // An unterminated fence still owns the lines that follow it.
        let mut parsed = parse_headed(start, document);
        if let Some(title) = title {
            parsed.entries.retain(|entry| entry != title);
        }
        return parsed;
    };
    let end_at = inner_start + end_offset;

    let entries = document[inner_start..end_at]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| Some(*line) != title)
        .map(|line| strip_bullet(line).to_string())
        .collect();

    ParsedBlock {
        before: &document[..start_at],
        entries,
        after: &document[end_at + end.len()..],
        found: true,
    }
}

/// Render a block for `style` holding `entries` in order.
pub fn render_block(style: &BlockStyle, entries: &[String]) -> String {
    let bullets = || {
        entries
            .iter()
            .map(|entry| format!("- {}", entry))
            .collect::<Vec<_>>()
    };

    match style {
        BlockStyle::Bare => entries.join("\n"),
        BlockStyle::Headed { header } => {
            let mut lines = vec![header.clone()];
            lines.extend(bullets());
            lines.join("\n")
        }
        BlockStyle::Fenced { start, end, title } => {
            let mut lines = vec![start.clone()];
            if let Some(title) = title {
                lines.push(title.clone());
                lines.push(String::new());
            }
            lines.extend(bullets());
            lines.push(end.clone());
            lines.join("\n")
        }
    }
}

/// Insert `entry` into the managed block of `document`, replacing the first
/// entry keyed by the same prefix. Everything outside the block is kept.
///
/// Bare text also drops any later lines with the same key, so duplicates
/// left by hand edits collapse into the one entry.
pub fn upsert(style: &BlockStyle, document: &str, entry: &LinkEntry) -> String {
    let parsed = parse_block(style, document);
    let mut entries = parsed.entries;

    match entries
        .iter()
        .position(|existing| style.matches(existing, entry.prefix()))
    {
        Some(index) => {
            entries[index] = entry.line().to_string();
            if matches!(style, BlockStyle::Bare) {
                let mut position = 0;
                entries.retain(|existing| {
                    let keep = position <= index || !style.matches(existing, entry.prefix());
                    position += 1;
                    keep
                });
            }
        }
        None => entries.push(entry.line().to_string()),
    }

    let block = render_block(style, &entries);

    if matches!(style, BlockStyle::Bare) {
        return block;
    }

    // A new block goes in front of the existing text.
    let (before, after) = if parsed.found {
        (parsed.before.trim_end(), parsed.after.trim_start())
    } else {
        ("", parsed.after.trim_start())
    };

    [before, block.as_str(), after]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The last parenthesised `http(s)://` URL on a line, as written by the
/// markdown link entries.
pub fn extract_url(line: &str) -> Option<&str> {
    let open = line
        .rfind("(https://")
        .or_else(|| line.rfind("(http://"))?;
    let close = line.rfind(')')?;
    if close <= open {
        return None;
    }
    Some(&line[open + 1..close])
}
