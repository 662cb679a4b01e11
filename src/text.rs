//! Markdown and slug helpers shared by the generator and the quality gate.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static TITLE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}#\s+(.+?)\s*#*\s*$").expect("title regex"));
static HEADING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}#{1,3}\s+\S").expect("heading regex"));
static ANY_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}#{1,6}(\s|$)").expect("heading regex"));
static LIST_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([-*+]|\d+[.)])\s+\S").expect("list regex"));
static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("link regex"));

const SLUG_MAX_LEN: usize = 80;

const STOPWORDS: &[&str] = &[
    "about", "above", "according", "across", "after", "again", "against", "also", "although",
    "among", "another", "around", "because", "been", "before", "being", "below", "between",
    "both", "could", "does", "doing", "down", "during", "each", "even", "every", "first",
    "from", "further", "have", "having", "here", "however", "into", "itself", "just", "last",
    "like", "made", "make", "many", "more", "most", "much", "must", "next", "only", "other",
    "over", "really", "same", "says", "said", "should", "since", "some", "still", "such",
    "than", "that", "their", "them", "then", "there", "these", "they", "thing", "things",
    "this", "those", "though", "through", "under", "until", "upon", "using", "very", "want",
    "were", "what", "when", "where", "whether", "which", "while", "will", "with", "within",
    "without", "would", "year", "years", "your", "yours",
];

/// Lowercase ASCII slug: runs of anything that isn't `[a-z0-9]` become one
/// hyphen, with no leading or trailing hyphen. May be empty.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    if slug.len() > SLUG_MAX_LEN {
        slug.truncate(SLUG_MAX_LEN);
        if let Some(cut) = slug.rfind('-') {
            slug.truncate(cut);
        }
    }
    slug
}

/// First level-1 heading, with the line index it was found on.
pub fn extract_title(markdown: &str) -> Option<(usize, String)> {
    markdown.lines().enumerate().find_map(|(i, line)| {
        TITLE_LINE
            .captures(line)
            .map(|caps| (i, strip_inline_markup(&caps[1])))
            .filter(|(_, title)| !title.is_empty())
    })
}

/// First paragraph-like block starting at `from_line`, flattened to one line
/// and cut to `max_chars`. Headings, fences, tables and rules are skipped;
/// a list is only used when nothing else is available.
pub fn derive_excerpt(markdown: &str, from_line: usize, max_chars: usize) -> String {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines().skip(from_line) {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if trimmed.is_empty() || ANY_HEADING.is_match(line) || is_rule(trimmed) {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }
        if trimmed.starts_with('|') {
            continue;
        }
        current.push(trimmed);
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    let chosen = blocks
        .iter()
        .find(|block| !LIST_LINE.is_match(block[0]))
        .or_else(|| blocks.first());

    match chosen {
        Some(block) => truncate_chars(&strip_inline_markup(&block.join(" ")), max_chars),
        None => String::new(),
    }
}

fn is_rule(trimmed: &str) -> bool {
    trimmed.len() >= 3
        && (trimmed.chars().all(|c| c == '-')
            || trimmed.chars().all(|c| c == '*')
            || trimmed.chars().all(|c| c == '_'))
}

fn strip_inline_markup(text: &str) -> String {
    let text = MARKDOWN_LINK.replace_all(text, "$1");
    let text = text.replace("**", "").replace("__", "").replace('`', "");
    let text = text.trim_start_matches("> ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts at a word boundary so the result, ellipsis included, is at most
/// `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let budget = max_chars.saturating_sub(3);
    let cut: String = text.chars().take(budget).collect();
    let cut = match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > budget / 2 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!(
        "{}...",
        cut.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == ';')
    )
}

/// Prefix of `text` no longer than `max_chars` characters.
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lines that are level 1-3 markdown headings.
pub fn heading_count(markdown: &str) -> usize {
    markdown.lines().filter(|l| HEADING_LINE.is_match(l)).count()
}

pub fn has_list_markup(markdown: &str) -> bool {
    markdown.lines().any(|l| LIST_LINE.is_match(l))
}

/// Frequency-ranked keywords: tokens longer than three characters that are
/// not stopwords, most frequent first, ties broken by first appearance.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let lowered = text.to_lowercase();
    let tokens = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 3)
        .filter(|t| !STOPWORDS.contains(t));

    for (position, token) in tokens.enumerate() {
        counts
            .entry(token.to_string())
            .or_insert((0, position))
            .0 += 1;
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
        count_b.cmp(count_a).then(first_a.cmp(first_b))
    });
    ranked
        .into_iter()
        .take(limit)
        .map(|(token, _)| token)
        .collect()
}
