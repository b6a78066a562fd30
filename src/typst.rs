//! Page-flow back-end: documents become Typst markup, compiled in-process
//! to fixed-size PDF pages.

use typst_as_lib::TypstEngine;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_library::layout::PagedDocument;
use typst_pdf::PdfOptions;

use crate::block::{Block, Document, Group, HeadingLevel, InlineRun};
use crate::config::{Color, Config};
use crate::error::RenderError;
use crate::format::{Format, Renderer};
use crate::inline::scan;
use crate::reflow::reflow;

/// Lists and tables up to this many entries are kept on one page.
const KEEP_TOGETHER_MAX: usize = 5;

/// Renders documents to PDF through Typst.
pub struct PdfRenderer {
    config: Config,
}

impl PdfRenderer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The Typst source that [`Renderer::render`] compiles.
    pub fn to_typst(&self, doc: &Document) -> String {
        blocks_to_typst(doc, &self.config)
    }

    fn compile(&self, doc: &Document) -> Result<PagedDocument, RenderError> {
        let typst_content = self.to_typst(doc);

        // Embedded fonts only, so output does not depend on the host
        let font_options = TypstKitFontOptions::new()
            .include_embedded_fonts(true)
            .include_system_fonts(false);

        let engine = TypstEngine::builder()
            .main_file(typst_content)
            .search_fonts_with(font_options)
            .build();

        let compiled = engine.compile();
        let output: Result<PagedDocument, _> = compiled.output;
        for warning in compiled.warnings.iter() {
            log::warn!("typst: {}", warning.message);
        }

        output.map_err(|e| RenderError::Compile(format!("{:?}", e)))
    }
}

impl Renderer for PdfRenderer {
    fn format(&self) -> Format {
        Format::Pdf
    }

    fn render(&self, doc: &Document) -> Result<Vec<u8>, RenderError> {
        let pages = self.compile(doc)?;

        let bytes = typst_pdf::pdf(&pages, &PdfOptions::default())
            .map_err(|e| RenderError::Export(format!("{:?}", e)))?;

        log::debug!(
            "rendered {} blocks to {} PDF pages ({} bytes)",
            doc.len(),
            pages.pages.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Convert a document to Typst markup
pub fn blocks_to_typst(doc: &Document, config: &Config) -> String {
    let mut writer = TypstWriter::new(config);
    writer.out.push_str(&preamble(config));

    let mut groups = doc.groups().peekable();
    while let Some(group) = groups.next() {
        match group {
            Group::Single(block) if matches!(block, Block::Heading { .. }) => {
                let keep_with_next =
                    matches!(groups.peek(), Some(Group::Single(Block::Paragraph { .. })));
                if !keep_with_next {
                    writer.emit_block(block);
                    continue;
                }

                // A heading never ends a page on its own
                writer.out.push_str("#block(breakable: false)[\n");
                writer.emit_block(block);
                if let Some(Group::Single(next)) = groups.next() {
                    writer.emit_block(next);
                }
                writer.out.push_str("]\n\n");
            }
            Group::Single(block) => writer.emit_block(block),
            Group::Bullets(items) => writer.emit_list(&items),
        }
    }

    writer.out
}

/// Page, font and show rules derived from the style palette.
fn preamble(config: &Config) -> String {
    let pdf = &config.pdf;
    let mut out = String::new();

    out.push_str(&format!(
        "#set page(paper: {}, margin: (x: {}pt, y: {}pt){})\n",
        string_literal(&pdf.paper),
        pdf.margin_x,
        pdf.margin_y,
        if pdf.page_numbers {
            ", numbering: \"1\""
        } else {
            ""
        }
    ));
    out.push_str(&format!(
        "#set text(font: {}, size: {}pt)\n",
        string_literal(&pdf.body_font),
        pdf.body_size
    ));
    out.push_str("#set par(justify: true, linebreaks: \"optimized\")\n");
    out.push_str(&format!(
        "#show raw: set text(font: {})\n",
        string_literal(&pdf.mono_font)
    ));
    out.push_str(&format!(
        "#show raw.where(block: true): set text(size: {}pt, fill: {})\n",
        pdf.code_size,
        rgb(config.code.text_color)
    ));
    for level in [HeadingLevel::H1, HeadingLevel::H2, HeadingLevel::H3] {
        let style = config.headings.for_level(level);
        out.push_str(&format!(
            "#show heading.where(level: {}): set text(size: {}pt, fill: {})\n",
            level.as_u8(),
            style.size,
            rgb(style.color)
        ));
    }
    out.push('\n');
    out
}

struct TypstWriter<'a> {
    config: &'a Config,
    // Longest first so "long long" wins over "long"
    keywords: Vec<&'a str>,
    out: String,
}

impl<'a> TypstWriter<'a> {
    fn new(config: &'a Config) -> Self {
        let mut keywords: Vec<&str> = config
            .inline
            .keywords
            .iter()
            .map(String::as_str)
            .filter(|k| !k.is_empty())
            .collect();
        keywords.sort_by_key(|k| std::cmp::Reverse(k.len()));

        Self {
            config,
            keywords,
            out: String::new(),
        }
    }

    fn emit_block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, text } => {
                for _ in 0..level.as_u8() {
                    self.out.push('=');
                }
                self.out.push(' ');
                self.inline(text);
                self.out.push_str("\n\n");
            }
            Block::Paragraph { text } => {
                self.inline(text);
                self.out.push_str("\n\n");
            }
            // Normally folded into Group::Bullets by Document::groups
            Block::BulletItem { text } => {
                self.emit_list(&[text.as_str()]);
            }
            Block::CodeBlock { lines } => {
                self.emit_code(lines);
            }
            Block::Table { .. } => {
                self.emit_table(block);
            }
        }
    }

    fn emit_list(&mut self, items: &[&str]) {
        // Wrap list to keep together when small, allow breaks when large
        let keep_together = items.len() <= KEEP_TOGETHER_MAX;
        if keep_together {
            self.out.push_str("#block(breakable: false)[\n");
        }
        for item in items {
            self.out.push_str("- ");
            self.inline(item);
            self.out.push('\n');
        }
        if keep_together {
            self.out.push_str("]\n\n");
        } else {
            self.out.push('\n');
        }
    }

    fn emit_code(&mut self, lines: &[String]) {
        let code = reflow(&lines.join("\n"), self.config.pdf.max_code_width);
        let style = &self.config.code;

        self.out.push_str(&format!(
            "#block(fill: {}, stroke: 0.5pt + {}, inset: (x: 10pt, y: 8pt), radius: 2pt, width: 100%)[\n",
            rgb(style.background),
            rgb(style.border)
        ));
        self.out.push_str("#raw(block: true, ");
        self.out.push_str(&string_literal(&code));
        self.out.push_str(")\n]\n\n");
    }

    fn emit_table(&mut self, table: &Block) {
        let col_count = table.column_count();
        let Some(header) = table.header() else {
            return;
        };
        if col_count == 0 {
            return;
        }
        let body = table.body();

        // Header row counts toward the limit
        let keep_together = body.len() < KEEP_TOGETHER_MAX;
        if keep_together {
            self.out.push_str("#block(breakable: false)[\n");
        }

        let style = &self.config.table;
        self.out.push_str("#table(\n");
        self.out.push_str(&format!("  columns: {},\n", col_count));
        self.out
            .push_str(&format!("  stroke: 0.4pt + {},\n", rgb(style.grid_color)));
        self.out.push_str("  inset: (x: 6pt, y: 4pt),\n");
        self.out.push_str(&format!(
            "  fill: (x, y) => if y == 0 {{ {} }},\n",
            rgb(style.header_fill)
        ));

        // Header repeats on every page the table spans
        self.out.push_str("  table.header(");
        self.emit_cells(header, col_count);
        self.out.push_str("),\n");

        for row in body {
            self.out.push_str("  ");
            self.emit_cells(row, col_count);
            self.out.push_str(",\n");
        }

        self.out.push_str(")\n");
        if keep_together {
            self.out.push_str("]\n");
        }
        self.out.push('\n');
    }

    /// Comma-separated content cells, padded to `col_count`.
    fn emit_cells(&mut self, row: &[String], col_count: usize) {
        for i in 0..col_count {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push('[');
            if let Some(cell) = row.get(i) {
                self.inline(cell);
            }
            self.out.push(']');
        }
    }

    fn inline(&mut self, text: &str) {
        for run in scan(text) {
            self.run(&run);
        }
    }

    // Every function call ends in `;` so following text cannot extend it
    fn run(&mut self, run: &InlineRun) {
        let config = self.config;
        let inline = &config.inline;
        match run {
            InlineRun::Plain(text) => self.plain(text),
            InlineRun::Bold(text) => {
                self.out.push_str("#strong[");
                escape_into(text, &mut self.out);
                self.out.push_str("];");
            }
            InlineRun::Italic(text) => {
                self.out.push_str("#emph[");
                escape_into(text, &mut self.out);
                self.out.push_str("];");
            }
            InlineRun::Code(text) => {
                self.out.push_str(&format!(
                    "#box(fill: {}, inset: (x: 2pt), outset: (y: 2pt), radius: 2pt)[#text(fill: {})[#raw({})]];",
                    rgb(inline.code_background),
                    rgb(inline.code_color),
                    string_literal(text)
                ));
            }
            InlineRun::Link { label, url } if url.trim().is_empty() => self.plain(label),
            InlineRun::Link { label, url } => {
                let underline = inline.link_underline;
                self.out.push_str(&format!("#link({})[", string_literal(url)));
                if underline {
                    self.out.push_str("#underline[");
                }
                self.out
                    .push_str(&format!("#text(fill: {})[", rgb(inline.link_color)));
                escape_into(label, &mut self.out);
                self.out.push(']');
                if underline {
                    self.out.push(']');
                }
                self.out.push_str("];");
            }
        }
    }

    fn plain(&mut self, text: &str) {
        for (piece, is_keyword) in split_keywords(text, &self.keywords) {
            if !is_keyword {
                escape_into(piece, &mut self.out);
                continue;
            }
            self.out.push_str(&format!(
                "#text(font: {}, weight: \"bold\", fill: {})[",
                string_literal(&self.config.pdf.mono_font),
                rgb(self.config.inline.keyword_color)
            ));
            escape_into(piece, &mut self.out);
            self.out.push_str("];");
        }
    }
}

/// Split plain text around whole-word keyword matches.
fn split_keywords<'t>(text: &'t str, keywords: &[&str]) -> Vec<(&'t str, bool)> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut prev: Option<char> = None;

    while i < text.len() {
        let rest = &text[i..];
        if !prev.is_some_and(is_word_char) {
            let hit = keywords.iter().find(|kw| {
                rest.starts_with(**kw) && !rest[kw.len()..].chars().next().is_some_and(is_word_char)
            });
            if let Some(kw) = hit {
                if start < i {
                    pieces.push((&text[start..i], false));
                }
                pieces.push((&text[i..i + kw.len()], true));
                i += kw.len();
                start = i;
                prev = kw.chars().last();
                continue;
            }
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        prev = Some(ch);
        i += ch.len_utf8();
    }

    if start < text.len() {
        pieces.push((&text[start..], false));
    }
    pieces
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Escape text so Typst shows it verbatim in markup.
fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' | '=' | '-' | '+'
            | '/' | '~' | '.' => {
                out.push('\\');
                out.push(ch);
            }
            '\t' => out.push(ch),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            _ => out.push(ch),
        }
    }
}

/// A Typst string literal.
fn string_literal(text: &str) -> String {
    let mut lit = String::with_capacity(text.len() + 2);
    lit.push('"');
    for ch in text.chars() {
        match ch {
            '"' => lit.push_str("\\\""),
            '\\' => lit.push_str("\\\\"),
            '\n' => lit.push_str("\\n"),
            '\r' => lit.push_str("\\r"),
            '\t' => lit.push_str("\\t"),
            c if c.is_control() => lit.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => lit.push(c),
        }
    }
    lit.push('"');
    lit
}

fn rgb(color: Color) -> String {
    format!("rgb(\"{}\")", color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn typst(markdown: &str) -> String {
        blocks_to_typst(&parse(markdown), &Config::compiled_default())
    }

    fn body(markdown: &str) -> String {
        let config = Config::compiled_default();
        typst(markdown)
            .strip_prefix(&preamble(&config))
            .map(str::to_string)
            .unwrap_or_default()
    }

    #[test]
    fn preamble_carries_palette() {
        let pre = preamble(&Config::compiled_default());
        assert!(pre.contains("#set page(paper: \"us-letter\", margin: (x: 60pt, y: 70pt))"));
        assert!(pre.contains("#set par(justify: true"));
        assert!(pre.contains(
            "#show heading.where(level: 1): set text(size: 20pt, fill: rgb(\"#0B3D91\"))"
        ));
        assert!(pre.contains(
            "#show heading.where(level: 3): set text(size: 14pt, fill: rgb(\"#8A5A44\"))"
        ));
    }

    #[test]
    fn page_numbers_when_enabled() {
        let config = Config::from_toml_str("[pdf]\npage_numbers = true\n").unwrap();
        assert!(preamble(&config).contains(", numbering: \"1\")"));
    }

    #[test]
    fn empty_document_is_preamble_only() {
        assert_eq!(body(""), "");
    }

    #[test]
    fn paragraph() {
        assert_eq!(body("Hello world"), "Hello world\n\n");
    }

    #[test]
    fn heading_alone() {
        assert_eq!(body("## Setup"), "== Setup\n\n");
    }

    #[test]
    fn heading_with_following_paragraph() {
        assert_eq!(
            body("# Title\n\nSome text."),
            "#block(breakable: false)[\n= Title\n\nSome text\\.\n\n]\n\n"
        );
    }

    #[test]
    fn bold_italic_code_link() {
        assert_eq!(body("**bold**"), "#strong[bold];\n\n");
        assert_eq!(body("*italic*"), "#emph[italic];\n\n");
        assert_eq!(
            body("`x`"),
            "#box(fill: rgb(\"#EEF2F7\"), inset: (x: 2pt), outset: (y: 2pt), radius: 2pt)[#text(fill: rgb(\"#B40000\"))[#raw(\"x\")]];\n\n"
        );
        assert_eq!(
            body("[site](https://a.b/c)"),
            "#link(\"https://a.b/c\")[#underline[#text(fill: rgb(\"#0066CC\"))[site]]];\n\n"
        );
    }

    #[test]
    fn link_without_target_is_plain_label() {
        assert_eq!(body("[site]()"), "site\n\n");
    }

    #[test]
    fn escapes_special_chars() {
        assert_eq!(body("a_b #c <d> @e $f"), "a\\_b \\#c \\<d\\> \\@e \\$f\n\n");
        assert_eq!(body("1. not a list"), "1\\. not a list\n\n");
        assert_eq!(body("= not a heading"), "\\= not a heading\n\n");
        assert_eq!(body("see http://x"), "see http:\\/\\/x\n\n");
    }

    #[test]
    fn control_characters_become_unicode_escapes() {
        assert_eq!(body("bell\u{7}"), "bell\\u{7}\n\n");
    }

    #[test]
    fn bullet_group_is_one_list() {
        assert_eq!(
            body("- one\n- two\n\n- **three**"),
            "#block(breakable: false)[\n- one\n- two\n- #strong[three];\n]\n\n"
        );
    }

    #[test]
    fn long_list_may_break() {
        let md: String = (1..=6).map(|i| format!("- item {i}\n")).collect();
        let out = body(&md);
        assert!(!out.starts_with("#block"));
        assert_eq!(out.matches("\n- ").count() + 1, 6);
    }

    #[test]
    fn table_with_header_fill() {
        let expected = "#block(breakable: false)[\n#table(\n  columns: 2,\n  stroke: 0.4pt + rgb(\"#808080\"),\n  inset: (x: 6pt, y: 4pt),\n  fill: (x, y) => if y == 0 { rgb(\"#F1F3F5\") },\n  table.header([a], [b]),\n  [1], [2],\n)\n]\n\n";
        assert_eq!(body("| a | b |\n|---|---|\n| 1 | 2 |\n"), expected);
    }

    #[test]
    fn five_row_table_stays_together_six_may_break() {
        let rows = |n: usize| -> String {
            (0..n).map(|i| format!("| r{i} | x |\n")).collect()
        };
        assert!(body(&rows(5)).starts_with("#block(breakable: false)[\n#table("));
        assert!(body(&rows(6)).starts_with("#table("));
    }

    #[test]
    fn ragged_table_rows_are_padded() {
        let out = body("| a | b | c |\n| 1 |");
        assert!(out.contains("columns: 3"));
        assert!(out.contains("  [1], [], [],\n"));
    }

    #[test]
    fn table_cells_are_inline_scanned() {
        let out = body("| **k** | `v` |\n|---|---|");
        assert!(out.contains("table.header([#strong[k];], [#box("));
    }

    #[test]
    fn code_block_is_raw_and_reflowed() {
        let long = format!("  {}", "y".repeat(100));
        let out = body(&format!("```c\nint *p = **q;\n{long}\n```"));

        let wrapped = format!("  {}\\n  {}", "y".repeat(83), "y".repeat(17));
        let expected = format!(
            "#block(fill: rgb(\"#F7F7F8\"), stroke: 0.5pt + rgb(\"#E5E7EB\"), inset: (x: 10pt, y: 8pt), radius: 2pt, width: 100%)[\n#raw(block: true, \"int *p = **q;\\n{wrapped}\")\n]\n\n"
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn keywords_are_highlighted_as_whole_words() {
        let kw = "#text(font: \"DejaVu Sans Mono\", weight: \"bold\", fill: rgb(\"#0A58CA\"))";
        assert_eq!(
            body("an int and a size_t"),
            format!("an {kw}[int]; and a {kw}[size\\_t];\n\n")
        );
        assert_eq!(body("integer points"), "integer points\n\n");
        assert_eq!(body("long long x"), format!("{kw}[long long]; x\n\n"));
    }

    #[test]
    fn keyword_highlighting_can_be_disabled() {
        let config = Config::from_toml_str("[inline]\nkeywords = []\n").unwrap();
        let out = blocks_to_typst(&parse("an int"), &config);
        assert!(out.ends_with("an int\n\n"));
    }

    #[test]
    fn split_keywords_pieces() {
        assert_eq!(
            split_keywords("x int_y int", &["int"]),
            vec![("x int_y ", false), ("int", true)]
        );
        assert_eq!(split_keywords("", &["int"]), vec![]);
    }

    #[test]
    fn string_literal_escapes() {
        assert_eq!(string_literal("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
        assert_eq!(string_literal("\u{1b}"), "\"\\u{1b}\"");
    }
}
