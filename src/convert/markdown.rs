//! Markdown converter.
//!
//! A line-oriented reader covering the common block syntax: ATX and setext
//! headings, bullet and numbered lists (nested by indentation), fenced and
//! indented code, block quotes, rules and pipe tables. Inline markup is
//! stripped down to its text.

use super::{ConvertOptions, DocumentConverter};
use crate::detect::SourceFormat;
use crate::error::Result;
use crate::input::InputFile;
use crate::model::{Block, Content};
use regex::Regex;

/// Markdown converter.
#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    atx_heading: Regex,
    setext_underline: Regex,
    rule: Regex,
    bullet: Regex,
    ordered: Regex,
    fence: Regex,
    table_separator: Regex,
    front_matter_key: Regex,
    inline: InlineStripper,
}

impl MarkdownConverter {
    /// Create a new Markdown converter.
    pub fn new() -> Self {
        Self {
            atx_heading: Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?(?:[ \t]+#+)?[ \t]*$").unwrap(),
            setext_underline: Regex::new(r"^ {0,3}(=+|-+)[ \t]*$").unwrap(),
            rule: Regex::new(r"^ {0,3}(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap(),
            bullet: Regex::new(r"^([ \t]*)[-*+][ \t]+(.*)$").unwrap(),
            ordered: Regex::new(r"^([ \t]*)(\d{1,9})[.)][ \t]+(.*)$").unwrap(),
            fence: Regex::new(r"^ {0,3}(`{3,}|~{3,})").unwrap(),
            table_separator: Regex::new(r"^\s*\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)*\|?\s*$").unwrap(),
            front_matter_key: Regex::new(r"^[A-Za-z0-9_-]+:(?:\s|$)").unwrap(),
            inline: InlineStripper::new(),
        }
    }

    /// Parse Markdown source into content.
    pub fn parse(&self, source: &str) -> Content {
        let source = source.replace("\r\n", "\n");
        let mut lines: Vec<&str> = source.split('\n').collect();
        let mut content = Content::new();

        let body_start = self.front_matter(&lines, &mut content);
        lines.drain(..body_start);

        let mut state = State::default();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];

            // Fenced code runs until the matching fence.
            if let Some(caps) = self.fence.captures(line) {
                self.flush(&mut state, &mut content);
                let marker = &caps[1];
                let mut code = Vec::new();
                i += 1;
                while i < lines.len() && !lines[i].trim_start().starts_with(marker) {
                    code.push(lines[i]);
                    i += 1;
                }
                content.push(Block::preformatted(code.join("\n")));
                i += 1;
                continue;
            }

            if line.trim().is_empty() {
                self.flush(&mut state, &mut content);
                state.list_indents.clear();
                i += 1;
                continue;
            }

            // Setext heading: a paragraph line underlined by === or ---.
            if state.paragraph.len() == 1 && state.list_item.is_none() {
                if let Some(caps) = self.setext_underline.captures(line) {
                    let level = if caps[1].starts_with('=') { 1 } else { 2 };
                    let text = self.inline.strip(&state.paragraph.remove(0));
                    content.push(Block::heading(level, text));
                    i += 1;
                    continue;
                }
            }

            if self.rule.is_match(line) {
                self.flush(&mut state, &mut content);
                content.push(Block::Rule);
                i += 1;
                continue;
            }

            if let Some(caps) = self.atx_heading.captures(line) {
                self.flush(&mut state, &mut content);
                let level = caps[1].len() as u8;
                let text = caps.get(2).map_or("", |m| m.as_str());
                content.push(Block::heading(level, self.inline.strip(text)));
                i += 1;
                continue;
            }

            if let Some(rest) = quote_text(line) {
                if state.quote.is_none() {
                    self.flush(&mut state, &mut content);
                }
                state.quote.get_or_insert_with(Vec::new).push(rest.to_string());
                i += 1;
                continue;
            }

            if let Some(caps) = self.bullet.captures(line) {
                self.flush(&mut state, &mut content);
                let depth = state.depth_for(indent_width(&caps[1]));
                state.list_item = Some((depth, None, vec![caps[2].to_string()]));
                i += 1;
                continue;
            }

            if let Some(caps) = self.ordered.captures(line) {
                self.flush(&mut state, &mut content);
                let depth = state.depth_for(indent_width(&caps[1]));
                let number = caps[2].parse().unwrap_or(1);
                state.list_item = Some((depth, Some(number), vec![caps[3].to_string()]));
                i += 1;
                continue;
            }

            if line.trim_start().starts_with('|') && line.contains('|') {
                self.flush(&mut state, &mut content);
                let mut rows = Vec::new();
                while i < lines.len() && lines[i].trim_start().starts_with('|') {
                    if !self.table_separator.is_match(lines[i]) {
                        rows.push(self.table_row(lines[i]));
                    }
                    i += 1;
                }
                content.push(Block::paragraph(rows.join("\n")));
                continue;
            }

            let indent = indent_width(line);
            if indent >= 4 && state.paragraph.is_empty() && state.list_item.is_none() {
                self.flush(&mut state, &mut content);
                let mut code = Vec::new();
                while i < lines.len() && (indent_width(lines[i]) >= 4 || lines[i].trim().is_empty()) {
                    code.push(strip_indent(lines[i], 4));
                    i += 1;
                }
                while code.last().is_some_and(|l| l.trim().is_empty()) {
                    code.pop();
                }
                content.push(Block::preformatted(code.join("\n")));
                continue;
            }

            // Lazy continuation of a list item or quote, or paragraph text.
            if let Some((_, _, item)) = state.list_item.as_mut() {
                item.push(line.trim().to_string());
            } else if let Some(quote) = state.quote.as_mut() {
                quote.push(line.trim().to_string());
            } else {
                state.paragraph.push(line.to_string());
            }
            i += 1;
        }
        self.flush(&mut state, &mut content);
        content
    }

    /// Skip a leading YAML front matter block, picking up `title` and `author`.
    ///
    /// The block only counts as front matter when it holds `key: value` lines
    /// (indented or `- ` continuation lines allowed); otherwise the opening
    /// `---` is a thematic break.
    fn front_matter(&self, lines: &[&str], content: &mut Content) -> usize {
        if lines.first().map(|l| l.trim()) != Some("---") {
            return 0;
        }
        let Some(end) = lines.iter().skip(1).position(|l| l.trim() == "---" || l.trim() == "...")
        else {
            return 0;
        };
        let block = &lines[1..=end];
        let has_key = block.iter().any(|l| self.front_matter_key.is_match(l));
        let all_yaml = block.iter().all(|l| {
            l.trim().is_empty()
                || self.front_matter_key.is_match(l)
                || l.starts_with([' ', '\t'])
                || l.starts_with("- ")
        });
        if !has_key || !all_yaml {
            return 0;
        }
        for line in block {
            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
                if value.is_empty() {
                    continue;
                }
                match key.trim() {
                    "title" => content.title = Some(value),
                    "author" => content.author = Some(value),
                    _ => {}
                }
            }
        }
        end + 2
    }

    fn table_row(&self, line: &str) -> String {
        line.trim()
            .trim_matches('|')
            .split('|')
            .map(|cell| self.inline.strip(cell.trim()))
            .collect::<Vec<_>>()
            .join("  |  ")
    }

    fn flush(&self, state: &mut State, content: &mut Content) {
        if !state.paragraph.is_empty() {
            let text = join_soft_breaks(&state.paragraph);
            content.push(Block::paragraph(self.inline.strip(&text)));
            state.paragraph.clear();
        }
        if let Some((depth, number, lines)) = state.list_item.take() {
            let text = self.inline.strip(&join_soft_breaks(&lines));
            content.push(Block::ListItem {
                depth,
                ordered: number,
                text,
            });
        }
        if let Some(lines) = state.quote.take() {
            let text = self.inline.strip(&join_soft_breaks(&lines));
            content.push(Block::quote(text));
        }
    }
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for MarkdownConverter {
    fn name(&self) -> &str {
        "markdown"
    }

    fn formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Markdown]
    }

    fn extract(&self, file: &InputFile, _options: &ConvertOptions) -> Result<Content> {
        Ok(self.parse(&file.text()))
    }
}

#[derive(Default)]
struct State {
    paragraph: Vec<String>,
    list_item: Option<(u8, Option<u32>, Vec<String>)>,
    quote: Option<Vec<String>>,
    list_indents: Vec<usize>,
}

impl State {
    /// Nesting depth of a list item at the given indentation.
    fn depth_for(&mut self, indent: usize) -> u8 {
        while self.list_indents.last().is_some_and(|&top| top > indent) {
            self.list_indents.pop();
        }
        if self.list_indents.last() != Some(&indent) {
            self.list_indents.push(indent);
        }
        (self.list_indents.len() - 1).min(5) as u8
    }
}

fn quote_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let rest = trimmed.strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn indent_width(text: &str) -> usize {
    text.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn strip_indent(line: &str, width: usize) -> &str {
    let mut removed = 0;
    for (idx, c) in line.char_indices() {
        if removed >= width || !(c == ' ' || c == '\t') {
            return &line[idx..];
        }
        removed += if c == '\t' { 4 } else { 1 };
    }
    ""
}

/// Join paragraph lines: soft breaks become spaces, hard breaks (two trailing
/// spaces or a backslash) stay newlines.
fn join_soft_breaks(lines: &[String]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let hard = line.ends_with("  ") || line.ends_with('\\');
        let text = line.trim().trim_end_matches('\\');
        out.push_str(text);
        if i + 1 < lines.len() {
            out.push(if hard { '\n' } else { ' ' });
        }
    }
    out
}

/// Removes inline Markdown syntax, keeping the visible text.
#[derive(Debug, Clone)]
pub(crate) struct InlineStripper {
    rules: Vec<(Regex, &'static str)>,
}

impl InlineStripper {
    pub(crate) fn new() -> Self {
        let rules = [
            (r"!\[([^\]]*)\]\([^)]*\)", "$1"),
            (r"\[([^\]]+)\]\([^)]*\)", "$1"),
            (r"\[([^\]]+)\]\[[^\]]*\]", "$1"),
            (r"<(https?://[^>\s]+)>", "$1"),
            (r"`([^`]+)`", "$1"),
            (r"\*\*([^*]+)\*\*", "$1"),
            (r"__([^_]+)__", "$1"),
            (r"\*([^*\s][^*]*)\*", "$1"),
            (r"(^|[^\w])_([^_\s][^_]*)_([^\w]|$)", "$1$2$3"),
            (r"~~([^~]+)~~", "$1"),
            (r"</?[A-Za-z][^>]*>", ""),
            (r"\\([\\`*_{}\[\]()#+\-.!>~|])", "$1"),
        ];
        Self {
            rules: rules
                .into_iter()
                .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
                .collect(),
        }
    }

    pub(crate) fn strip(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (re, replacement) in &self.rules {
            out = re.replace_all(&out, *replacement).into_owned();
        }
        out.trim().to_string()
    }
}
