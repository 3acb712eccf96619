//! HTML converter.
//!
//! A tolerant tag scanner rather than a DOM parser: block tags open and
//! close blocks, everything else contributes its text. The same extractor
//! reads EPUB chapters.

use super::{ConvertOptions, DocumentConverter};
use crate::detect::SourceFormat;
use crate::error::Result;
use crate::input::InputFile;
use crate::model::{Block, Content, ImageData};
use regex::{Captures, Regex};

/// HTML converter.
#[derive(Debug, Clone)]
pub struct HtmlConverter {
    extractor: HtmlExtractor,
}

impl HtmlConverter {
    /// Create a new HTML converter.
    pub fn new() -> Self {
        Self {
            extractor: HtmlExtractor::new(),
        }
    }
}

impl Default for HtmlConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for HtmlConverter {
    fn name(&self) -> &str {
        "html"
    }

    fn formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Html]
    }

    fn extract(&self, file: &InputFile, _options: &ConvertOptions) -> Result<Content> {
        // Standalone pages have no package to resolve relative images against.
        Ok(self.extractor.extract(&file.text(), &mut |_, _| None))
    }
}

/// Resolves an `<img>` source (and alt text) to image data.
pub(crate) type ImageResolver<'a> = dyn FnMut(&str, Option<&str>) -> Option<ImageData> + 'a;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Paragraph,
    Heading(u8),
    Item { depth: u8, ordered: Option<u32> },
    Pre,
    Quote,
}

/// Extracts blocks from HTML or XHTML markup.
#[derive(Debug, Clone)]
pub(crate) struct HtmlExtractor {
    title: Regex,
    invisible: Vec<Regex>,
    svg: Regex,
    svg_image: Regex,
    tag: Regex,
    attr: Regex,
    entity: Regex,
    whitespace: Regex,
}

impl HtmlExtractor {
    pub(crate) fn new() -> Self {
        let invisible = [
            r"(?s)<!--.*?-->",
            r"(?s)<!\[CDATA\[.*?\]\]>",
            r"(?s)<![^>]*>",
            r"(?s)<\?.*?\?>",
            r"(?is)<head\b.*?</head\s*>",
            r"(?is)<script\b.*?</script\s*>",
            r"(?is)<style\b.*?</style\s*>",
            r"(?is)<noscript\b.*?</noscript\s*>",
            r"(?is)<template\b.*?</template\s*>",
        ];
        Self {
            title: Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap(),
            invisible: invisible.iter().map(|p| Regex::new(p).unwrap()).collect(),
            svg: Regex::new(r"(?is)<svg\b.*?</svg\s*>").unwrap(),
            svg_image: Regex::new(r"(?is)<image\b((?:[^>\x22']|\x22[^\x22]*\x22|'[^']*')*)>").unwrap(),
            tag: Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9:-]*)((?:[^>\x22']|\x22[^\x22]*\x22|'[^']*')*)>").unwrap(),
            attr: Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#).unwrap(),
            entity: Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});").unwrap(),
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Extract content from markup. `images` resolves `<img>` sources.
    pub(crate) fn extract(&self, html: &str, images: &mut ImageResolver<'_>) -> Content {
        let mut content = Content::new();
        content.title = self
            .title
            .captures(html)
            .map(|c| self.collapse(&self.decode_entities(&c[1])))
            .filter(|t| !t.is_empty());

        let mut cleaned = html.to_string();
        for re in &self.invisible {
            cleaned = re.replace_all(&cleaned, "").into_owned();
        }
        cleaned = self
            .svg
            .replace_all(&cleaned, |caps: &Captures| self.svg_images(&caps[0]))
            .into_owned();

        let mut state = State::default();
        let mut last = 0;
        for caps in self.tag.captures_iter(&cleaned) {
            let Some(whole) = caps.get(0) else { continue };
            self.push_text(&mut state, &cleaned[last..whole.start()]);
            last = whole.end();

            let name = caps[2].to_ascii_lowercase();
            if caps[1].is_empty() {
                self.open(&mut state, &mut content, &name, &caps[3], images);
            } else {
                self.close(&mut state, &mut content, &name);
            }
        }
        self.push_text(&mut state, &cleaned[last..]);
        state.flush(&mut content);
        content
    }

    /// Reduce an inline `<svg>` to the raster `<image>` references it holds.
    fn svg_images(&self, svg: &str) -> String {
        self.svg_image
            .captures_iter(svg)
            .filter(|caps| {
                self.attribute(&caps[1], "xlink:href")
                    .or_else(|| self.attribute(&caps[1], "href"))
                    .is_some()
            })
            .map(|caps| format!("<image{}>", caps[1].trim_end_matches('/')))
            .collect()
    }

    fn open(
        &self,
        state: &mut State,
        content: &mut Content,
        name: &str,
        attrs: &str,
        images: &mut ImageResolver<'_>,
    ) {
        match name {
            "br" => state.buffer.push('\n'),
            "hr" => {
                state.flush(content);
                content.push(Block::Rule);
            }
            "img" | "image" => {
                let src = self
                    .attribute(attrs, "src")
                    .or_else(|| self.attribute(attrs, "xlink:href"))
                    .or_else(|| self.attribute(attrs, "href"));
                let alt = self.attribute(attrs, "alt");
                if let Some(src) = src {
                    match images(&src, alt.as_deref()) {
                        Some(image) => {
                            state.flush(content);
                            content.push(Block::Image(image));
                        }
                        None => log::debug!("Skipping image {src}"),
                    }
                }
            }
            "td" | "th" => {
                if !state.buffer.trim().is_empty() && !state.buffer.ends_with('\n') {
                    state.buffer.push_str("  |  ");
                }
            }
            "ul" | "ol" => {
                state.flush(content);
                let counter = (name == "ol").then(|| {
                    self.attribute(attrs, "start")
                        .and_then(|s| s.trim().parse::<u32>().ok())
                        .unwrap_or(1)
                        .saturating_sub(1)
                });
                state.lists.push(counter);
                let kind = state.container_kind();
                state.stack.push((name.to_string(), kind));
            }
            "li" => {
                state.flush(content);
                if state.top_name() == Some("li") {
                    state.stack.pop();
                }
                let ordered = match state.lists.last_mut() {
                    Some(Some(n)) => {
                        *n += 1;
                        Some(*n)
                    }
                    _ => None,
                };
                let depth = state.lists.len().saturating_sub(1).min(5) as u8;
                state.stack.push((name.to_string(), Kind::Item { depth, ordered }));
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                state.flush(content);
                let level = name[1..].parse().unwrap_or(1);
                state.stack.push((name.to_string(), Kind::Heading(level)));
            }
            "pre" => {
                state.flush(content);
                state.stack.push((name.to_string(), Kind::Pre));
            }
            "blockquote" => {
                state.flush(content);
                state.stack.push((name.to_string(), Kind::Quote));
            }
            _ if is_block(name) => {
                state.flush(content);
                if name == "p" && state.top_name() == Some("p") {
                    state.stack.pop();
                }
                let kind = state.container_kind();
                state.stack.push((name.to_string(), kind));
            }
            _ => {}
        }
    }

    fn close(&self, state: &mut State, content: &mut Content, name: &str) {
        match name {
            "tr" => state.buffer.push('\n'),
            "ul" | "ol" | "li" | "pre" | "blockquote" | "h1" | "h2" | "h3" | "h4" | "h5"
            | "h6" => {
                state.flush(content);
                state.pop_to(name);
                if name == "ul" || name == "ol" {
                    state.lists.pop();
                }
            }
            _ if is_block(name) => {
                state.flush(content);
                state.pop_to(name);
            }
            _ => {}
        }
    }

    fn push_text(&self, state: &mut State, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let text = self.decode_entities(raw);
        if state.kind() == Kind::Pre {
            state.buffer.push_str(&text);
            return;
        }
        let collapsed = self.whitespace.replace_all(&text, " ");
        if state.buffer.is_empty() || state.buffer.ends_with(['\n', ' ']) {
            state.buffer.push_str(collapsed.trim_start());
        } else {
            state.buffer.push_str(&collapsed);
        }
    }

    fn attribute(&self, attrs: &str, name: &str) -> Option<String> {
        self.attr.captures_iter(attrs).find_map(|caps| {
            if !caps[1].eq_ignore_ascii_case(name) {
                return None;
            }
            let value = caps.get(2).or(caps.get(3)).or(caps.get(4))?;
            Some(self.decode_entities(value.as_str()))
        })
    }

    fn collapse(&self, text: &str) -> String {
        self.whitespace.replace_all(text, " ").trim().to_string()
    }

    /// Decode character references.
    pub(crate) fn decode_entities(&self, text: &str) -> String {
        if !text.contains('&') {
            return text.to_string();
        }
        self.entity
            .replace_all(text, |caps: &Captures| {
                let body = &caps[1];
                let decoded = if let Some(hex) = body.strip_prefix("#x").or(body.strip_prefix("#X")) {
                    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                } else if let Some(dec) = body.strip_prefix('#') {
                    dec.parse().ok().and_then(char::from_u32)
                } else {
                    named_entity(body)
                };
                decoded.map_or_else(|| caps[0].to_string(), String::from)
            })
            .into_owned()
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "main"
            | "aside"
            | "nav"
            | "figure"
            | "figcaption"
            | "table"
            | "caption"
            | "dl"
            | "dt"
            | "dd"
            | "address"
            | "center"
            | "body"
            | "form"
            | "fieldset"
            | "details"
            | "summary"
    )
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "laquo" => '«',
        "raquo" => '»',
        "bull" => '•',
        "middot" => '·',
        "euro" => '€',
        "pound" => '£',
        "yen" => '¥',
        "cent" => '¢',
        "sect" => '§',
        "para" => '¶',
        "deg" => '°',
        "plusmn" => '±',
        "times" => '×',
        "divide" => '÷',
        "frac12" => '½',
        "frac14" => '¼',
        "frac34" => '¾',
        "shy" => '\u{ad}',
        "larr" => '←',
        "rarr" => '→',
        "auml" => 'ä',
        "ouml" => 'ö',
        "uuml" => 'ü',
        "Auml" => 'Ä',
        "Ouml" => 'Ö',
        "Uuml" => 'Ü',
        "szlig" => 'ß',
        "eacute" => 'é',
        "egrave" => 'è',
        "ecirc" => 'ê',
        "aacute" => 'á',
        "agrave" => 'à',
        "acirc" => 'â',
        "ccedil" => 'ç',
        "ntilde" => 'ñ',
        "oacute" => 'ó',
        "iacute" => 'í',
        "uacute" => 'ú',
        "Eacute" => 'É',
        _ => return None,
    };
    Some(c)
}

#[derive(Default)]
struct State {
    buffer: String,
    stack: Vec<(String, Kind)>,
    lists: Vec<Option<u32>>,
}

impl State {
    fn kind(&self) -> Kind {
        self.stack.last().map_or(Kind::Paragraph, |(_, kind)| *kind)
    }

    fn top_name(&self) -> Option<&str> {
        self.stack.last().map(|(name, _)| name.as_str())
    }

    /// Kind inherited by a generic container opened at this point.
    fn container_kind(&self) -> Kind {
        match self.kind() {
            kind @ (Kind::Item { .. } | Kind::Quote | Kind::Pre) => kind,
            _ => Kind::Paragraph,
        }
    }

    fn pop_to(&mut self, name: &str) {
        if let Some(pos) = self.stack.iter().rposition(|(n, _)| n == name) {
            self.stack.truncate(pos);
        }
    }

    fn flush(&mut self, content: &mut Content) {
        let raw = std::mem::take(&mut self.buffer);
        let kind = self.kind();
        let text = if kind == Kind::Pre {
            raw.trim_matches('\n').trim_end().to_string()
        } else {
            raw.split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        };
        if text.trim().is_empty() {
            return;
        }
        let block = match kind {
            Kind::Paragraph => Block::paragraph(text),
            Kind::Heading(level) => Block::heading(level, text.replace('\n', " ")),
            Kind::Item { depth, ordered } => Block::ListItem {
                depth,
                ordered,
                text,
            },
            Kind::Pre => Block::preformatted(text),
            Kind::Quote => Block::quote(text),
        };
        content.push(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Content {
        HtmlExtractor::new().extract(html, &mut |_, _| None)
    }

    #[test]
    fn test_title_and_blocks() {
        let content = extract(
            "<!DOCTYPE html><html><head><title>My &amp; Page</title>\
             <style>p { color: red }</style></head>\
             <body><h1>Hello</h1><p>First   <b>bold</b>\n line<br>second</p>\
             <script>alert(1)</script><hr/><pre>  code\n    here</pre></body></html>",
        );
        assert_eq!(content.title.as_deref(), Some("My & Page"));
        assert_eq!(
            content.blocks,
            vec![
                Block::heading(1, "Hello"),
                Block::paragraph("First bold line\nsecond"),
                Block::Rule,
                Block::preformatted("  code\n    here"),
            ]
        );
    }

    #[test]
    fn test_lists() {
        let content = extract(
            "<ul><li>one</li><li>two<ol start=\"5\"><li>five</li><li>six</ol></li></ul><p>after</p>",
        );
        assert_eq!(
            content.blocks,
            vec![
                Block::bullet(0, "one"),
                Block::bullet(0, "two"),
                Block::numbered(1, 5, "five"),
                Block::numbered(1, 6, "six"),
                Block::paragraph("after"),
            ]
        );
    }

    #[test]
    fn test_table_and_quote() {
        let content = extract(
            "<table><tr><th>a</th><th>b</th></tr><tr><td>1</td><td>2</td></tr></table>\
             <blockquote><p>wise words</p></blockquote>",
        );
        assert_eq!(
            content.blocks,
            vec![Block::paragraph("a  |  b\n1  |  2"), Block::quote("wise words")]
        );
    }

    #[test]
    fn test_entities() {
        let extractor = HtmlExtractor::new();
        assert_eq!(
            extractor.decode_entities("&lt;a&gt; &#65;&#x42; &eacute; &bogus;"),
            "<a> AB é &bogus;"
        );
    }

    #[test]
    fn test_images_resolved() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let mut seen = Vec::new();
        let content = HtmlExtractor::new().extract(
            "<p>before</p><img src=\"img/a.png\" alt=\"A\"/><p>after</p>",
            &mut |src, alt| {
                seen.push((src.to_string(), alt.map(String::from)));
                Some(ImageData::new(SourceFormat::Png, png.clone()))
            },
        );
        assert_eq!(seen, vec![("img/a.png".to_string(), Some("A".to_string()))]);
        assert_eq!(content.image_count(), 1);
        assert_eq!(content.blocks.len(), 3);
    }

    #[test]
    fn test_svg_cover_image_resolved() {
        let mut seen = Vec::new();
        let content = HtmlExtractor::new().extract(
            "<body><svg xmlns:xlink=\"http://www.w3.org/1999/xlink\" viewBox=\"0 0 600 800\">\
             <text>Cover caption</text>\
             <image width=\"600\" height=\"800\" xlink:href=\"../images/cover.jpg\"/></svg>\
             <p>Chapter one</p></body>",
            &mut |src, _| {
                seen.push(src.to_string());
                Some(ImageData::new(SourceFormat::Jpeg, vec![0xFF, 0xD8, 0xFF]))
            },
        );
        assert_eq!(seen, vec!["../images/cover.jpg".to_string()]);
        assert_eq!(content.image_count(), 1);
        assert_eq!(content.blocks.last(), Some(&Block::paragraph("Chapter one")));
        assert_eq!(content.blocks.len(), 2);
    }
}
