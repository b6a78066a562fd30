use crate::block::{Block, Document, HeadingLevel};

/// Closing phrases language models like to append to generated docs.
const END_SENTINELS: [&str; 4] = [
    "end of documentation",
    "end of document",
    "documentation ends here",
    "end.",
];

const FENCE: &str = "```";
const RULE: &str = "---";

/// Parse markdown text into a document. Never fails: unrecognized lines
/// become paragraphs and unterminated constructs are closed at the end.
pub fn parse(markdown: &str) -> Document {
    let mut blocks = Vec::new();
    let mut state = ParseState::default();

    for line in markdown.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if is_ignored(line) {
            continue;
        }
        process_line(line, &mut state, &mut blocks);
    }

    finish(state, &mut blocks);
    Document::new(blocks)
}

#[derive(Default)]
struct ParseState {
    // Code fence state
    in_code: bool,
    code_lines: Vec<String>,

    // Raw table rows waiting for a non-table line
    table_rows: Vec<String>,
}

fn is_ignored(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed == RULE {
        return true;
    }
    let lowered = trimmed.to_lowercase();
    END_SENTINELS.contains(&lowered.as_str())
}

fn process_line(line: &str, state: &mut ParseState, blocks: &mut Vec<Block>) {
    let stripped = line.trim_end();

    // Fences toggle code mode; the language tag is dropped
    if stripped.trim_start().starts_with(FENCE) {
        if state.in_code {
            flush_code(state, blocks);
        } else {
            flush_table(state, blocks);
            state.in_code = true;
        }
        return;
    }

    if state.in_code {
        state.code_lines.push(line.to_string());
        return;
    }

    if is_table_row(stripped) {
        state.table_rows.push(stripped.to_string());
        return;
    }
    flush_table(state, blocks);

    if let Some(block) = classify(stripped) {
        blocks.push(block);
    }
}

fn classify(stripped: &str) -> Option<Block> {
    let text = stripped.trim_start();
    if text.is_empty() {
        return None;
    }

    let headings = [
        ("# ", HeadingLevel::H1),
        ("## ", HeadingLevel::H2),
        ("### ", HeadingLevel::H3),
    ];
    for (marker, level) in headings {
        if let Some(rest) = text.strip_prefix(marker) {
            return Some(Block::Heading {
                level,
                text: rest.trim().to_string(),
            });
        }
    }

    if let Some(rest) = text.strip_prefix("- ") {
        return Some(Block::BulletItem {
            text: rest.trim().to_string(),
        });
    }

    Some(Block::Paragraph {
        text: text.to_string(),
    })
}

fn is_table_row(line: &str) -> bool {
    line.matches('|').count() >= 2
}

fn flush_code(state: &mut ParseState, blocks: &mut Vec<Block>) {
    state.in_code = false;
    let lines = std::mem::take(&mut state.code_lines);
    if !lines.is_empty() {
        blocks.push(Block::CodeBlock { lines });
    }
}

fn flush_table(state: &mut ParseState, blocks: &mut Vec<Block>) {
    if state.table_rows.is_empty() {
        return;
    }

    let rows: Vec<Vec<String>> = std::mem::take(&mut state.table_rows)
        .iter()
        .map(|row| split_cells(row))
        .filter(|cells| !is_separator(cells))
        .collect();

    if rows.is_empty() {
        log::debug!("table held only separator rows, dropping it");
        return;
    }
    blocks.push(Block::Table { rows });
}

fn split_cells(row: &str) -> Vec<String> {
    let row = row.trim();
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = row.strip_suffix('|').unwrap_or(row);
    row.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// The `|---|:--:|` alignment row.
fn is_separator(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|cell| cell.chars().all(|c| c == '-' || c == ':'))
}

fn finish(mut state: ParseState, blocks: &mut Vec<Block>) {
    if state.in_code {
        log::debug!(
            "unterminated code fence, flushing {} buffered lines",
            state.code_lines.len()
        );
        flush_code(&mut state, blocks);
    }
    if !state.table_rows.is_empty() {
        log::debug!("table runs to end of input");
        flush_table(&mut state, blocks);
    }
}
