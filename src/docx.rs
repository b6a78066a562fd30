//! Flow-document back-end: documents become a DOCX word-processing file.

use std::borrow::Cow;
use std::io::Cursor;

use docx_rs::{
    AbstractNumbering, AlignmentType, BorderType, BreakType, Docx, Hyperlink, HyperlinkType,
    IndentLevel, Level, LevelJc, LevelText, NumberFormat, Numbering, NumberingId, Paragraph, Run,
    RunFonts, Shading, SpecialIndentType, Start, Style, StyleType, Table, TableBorder, TableBorderPosition,
    TableBorders, TableCell, TableRow, WidthType,
};

use crate::block::{Block, Document, Group, HeadingLevel, InlineRun};
use crate::config::{Color, Config};
use crate::error::RenderError;
use crate::format::{Format, Renderer};
use crate::inline::scan;
use crate::reflow::reflow;

const BULLET_NUMBERING: usize = 1;

/// Renders documents to DOCX.
pub struct DocxRenderer {
    config: Config,
}

impl DocxRenderer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Renderer for DocxRenderer {
    fn format(&self) -> Format {
        Format::Docx
    }

    fn render(&self, doc: &Document) -> Result<Vec<u8>, RenderError> {
        let mut buffer = Cursor::new(Vec::new());
        blocks_to_docx(doc, &self.config)
            .build()
            .pack(&mut buffer)
            .map_err(|e| RenderError::Package(e.to_string()))?;

        let bytes = buffer.into_inner();
        log::debug!("rendered {} blocks to {} DOCX bytes", doc.len(), bytes.len());
        Ok(bytes)
    }
}

/// Convert a document to a DOCX model.
pub fn blocks_to_docx(doc: &Document, config: &Config) -> Docx {
    let style = &config.docx;
    let mut docx = Docx::new()
        .default_fonts(fonts(&style.body_font))
        .default_size(half_points(style.body_size))
        .add_abstract_numbering(
            AbstractNumbering::new(BULLET_NUMBERING).add_level(Level::new(
                0,
                Start::new(1),
                NumberFormat::new("bullet"),
                LevelText::new("•"),
                LevelJc::new("left"),
            )
            .indent(Some(720), Some(SpecialIndentType::Hanging(360)), None, None)),
        )
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING));

    for level in [HeadingLevel::H1, HeadingLevel::H2, HeadingLevel::H3] {
        docx = docx.add_style(heading_style(level, config));
    }

    for group in doc.groups() {
        docx = match group {
            Group::Single(block) => add_block(docx, block, config),
            Group::Bullets(items) => items
                .iter()
                .fold(docx, |docx, item| docx.add_paragraph(bullet_paragraph(item, config))),
        };
    }

    docx
}

fn heading_style(level: HeadingLevel, config: &Config) -> Style {
    let heading = config.headings.for_level(level);
    let n = level.as_u8();
    Style::new(format!("Heading{n}"), StyleType::Paragraph)
        .name(format!("Heading {n}"))
        .size(half_points(heading.size))
        .color(heading.color.hex())
        .bold()
}

fn add_block(docx: Docx, block: &Block, config: &Config) -> Docx {
    match block {
        Block::Heading { level, text } => {
            let paragraph = Paragraph::new().style(&format!("Heading{}", level.as_u8()));
            docx.add_paragraph(inline_paragraph(paragraph, text, config))
        }
        Block::Paragraph { text } => {
            let paragraph = Paragraph::new().align(AlignmentType::Both);
            docx.add_paragraph(inline_paragraph(paragraph, text, config))
        }
        // Normally folded into Group::Bullets by Document::groups
        Block::BulletItem { text } => docx.add_paragraph(bullet_paragraph(text, config)),
        Block::CodeBlock { lines } => docx
            .add_table(code_box(lines, config))
            .add_paragraph(Paragraph::new()),
        Block::Table { .. } => match grid_table(block, config) {
            // An empty paragraph keeps consecutive tables from merging
            Some(table) => docx.add_table(table).add_paragraph(Paragraph::new()),
            None => docx,
        },
    }
}

fn bullet_paragraph(text: &str, config: &Config) -> Paragraph {
    let paragraph =
        Paragraph::new().numbering(NumberingId::new(BULLET_NUMBERING), IndentLevel::new(0));
    inline_paragraph(paragraph, text, config)
}

/// Code rendered as a shaded single-cell table.
fn code_box(lines: &[String], config: &Config) -> Table {
    let code = reflow(&lines.join("\n"), config.docx.max_code_width);

    let mut run = Run::new()
        .fonts(fonts(&config.docx.mono_font))
        .size(half_points(config.docx.code_size))
        .color(config.code.text_color.hex());
    for (i, line) in code.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(xml_safe(line));
    }

    let cell = TableCell::new()
        .add_paragraph(Paragraph::new().add_run(run))
        .shading(Shading::new().fill(config.code.background.hex()));

    Table::new(vec![TableRow::new(vec![cell])])
        .width(5000, WidthType::Pct)
        .set_borders(borders(config.code.border))
}

fn grid_table(block: &Block, config: &Config) -> Option<Table> {
    let col_count = block.column_count();
    let header = block.header()?;
    if col_count == 0 {
        return None;
    }

    let table_rows = std::iter::once(header)
        .chain(block.body().iter().map(Vec::as_slice))
        .enumerate()
        .map(|(i, row)| {
            let cells = (0..col_count)
                .map(|col| {
                    let text = row.get(col).map(String::as_str).unwrap_or("");
                    let cell =
                        TableCell::new().add_paragraph(inline_paragraph(Paragraph::new(), text, config));
                    if i == 0 {
                        cell.shading(Shading::new().fill(config.table.header_fill.hex()))
                    } else {
                        cell
                    }
                })
                .collect();
            TableRow::new(cells)
        })
        .collect();

    Some(
        Table::new(table_rows)
            .width(5000, WidthType::Pct)
            .set_borders(borders(config.table.grid_color)),
    )
}

fn borders(color: Color) -> TableBorders {
    [
        TableBorderPosition::Top,
        TableBorderPosition::Left,
        TableBorderPosition::Bottom,
        TableBorderPosition::Right,
        TableBorderPosition::InsideH,
        TableBorderPosition::InsideV,
    ]
    .into_iter()
    .fold(TableBorders::new(), |borders, position| {
        borders.set(
            TableBorder::new(position)
                .border_type(BorderType::Single)
                .size(4)
                .color(color.hex()),
        )
    })
}

fn inline_paragraph(paragraph: Paragraph, text: &str, config: &Config) -> Paragraph {
    let inline = &config.inline;

    scan(text)
        .into_iter()
        .fold(paragraph, |paragraph, run| match run {
            InlineRun::Plain(text) => paragraph.add_run(Run::new().add_text(xml_safe(&text))),
            InlineRun::Bold(text) => paragraph.add_run(Run::new().add_text(xml_safe(&text)).bold()),
            InlineRun::Italic(text) => {
                paragraph.add_run(Run::new().add_text(xml_safe(&text)).italic())
            }
            InlineRun::Code(text) => paragraph.add_run(
                Run::new()
                    .add_text(xml_safe(&text))
                    .fonts(fonts(&config.docx.mono_font))
                    .size(half_points(config.docx.code_size))
                    .color(inline.code_color.hex()),
            ),
            InlineRun::Link { label, url } if url.trim().is_empty() => {
                paragraph.add_run(Run::new().add_text(xml_safe(&label)))
            }
            InlineRun::Link { label, url } => {
                let mut run = Run::new()
                    .add_text(xml_safe(&label))
                    .color(inline.link_color.hex());
                if inline.link_underline {
                    run = run.underline("single");
                }
                paragraph.add_hyperlink(
                    Hyperlink::new(xml_safe(&url), HyperlinkType::External).add_run(run),
                )
            }
        })
}

fn fonts(name: &str) -> RunFonts {
    RunFonts::new().ascii(name).hi_ansi(name).cs(name)
}

/// Word measures font sizes in half points.
fn half_points(points: f64) -> usize {
    (points * 2.0).round().max(1.0) as usize
}

/// XML 1.0 cannot carry most control characters or the U+FFFE/U+FFFF
/// noncharacters; show a replacement mark.
fn xml_safe(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_xml_forbidden) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if is_xml_forbidden(c) { '\u{FFFD}' } else { c })
            .collect(),
    )
}

fn is_xml_forbidden(c: char) -> bool {
    (c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
        || matches!(c, '\u{FFFE}' | '\u{FFFF}')
}
