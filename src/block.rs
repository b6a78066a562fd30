/// Heading depth. Only three levels are recognized; deeper markers are
/// ordinary paragraph text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }
}

/// Inline text run with formatting, produced per line at render time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineRun {
    Plain(String),
    Bold(String),
    Italic(String),
    Code(String),
    Link { label: String, url: String },
}

impl InlineRun {
    /// The characters this run puts on the page.
    pub fn text(&self) -> &str {
        match self {
            InlineRun::Plain(text)
            | InlineRun::Bold(text)
            | InlineRun::Italic(text)
            | InlineRun::Code(text) => text,
            InlineRun::Link { label, .. } => label,
        }
    }
}

/// Block-level elements segmented from the markdown source.
///
/// Text is kept raw; inline spans are scanned by each renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: HeadingLevel, text: String },
    Paragraph { text: String },
    BulletItem { text: String },
    CodeBlock { lines: Vec<String> },
    Table { rows: Vec<Vec<String>> },
}

impl Block {
    /// Header row of a table (the first row by convention).
    pub fn header(&self) -> Option<&[String]> {
        match self {
            Block::Table { rows } => rows.first().map(Vec::as_slice),
            _ => None,
        }
    }

    /// Data rows of a table, i.e. everything after the header.
    pub fn body(&self) -> &[Vec<String>] {
        match self {
            Block::Table { rows } if !rows.is_empty() => &rows[1..],
            _ => &[],
        }
    }

    /// Width of the widest table row; zero for non-table blocks.
    pub fn column_count(&self) -> usize {
        match self {
            Block::Table { rows } => rows.iter().map(Vec::len).max().unwrap_or(0),
            _ => 0,
        }
    }
}

/// An ordered sequence of blocks, built once per render request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Walk the blocks with every maximal run of adjacent bullet items
    /// folded into one list.
    pub fn groups(&self) -> Groups<'_> {
        Groups {
            blocks: &self.blocks,
            pos: 0,
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// A unit of rendering: a lone block, or the items of one bullet list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Group<'a> {
    Single(&'a Block),
    Bullets(Vec<&'a str>),
}

pub struct Groups<'a> {
    blocks: &'a [Block],
    pos: usize,
}

impl<'a> Iterator for Groups<'a> {
    type Item = Group<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.blocks.get(self.pos)?;

        if !matches!(block, Block::BulletItem { .. }) {
            self.pos += 1;
            return Some(Group::Single(block));
        }

        let mut items = Vec::new();
        while let Some(Block::BulletItem { text }) = self.blocks.get(self.pos) {
            items.push(text.as_str());
            self.pos += 1;
        }
        Some(Group::Bullets(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bullet(text: &str) -> Block {
        Block::BulletItem {
            text: text.to_string(),
        }
    }

    fn paragraph(text: &str) -> Block {
        Block::Paragraph {
            text: text.to_string(),
        }
    }

    #[test]
    fn adjacent_bullets_form_one_group() {
        let doc = Document::new(vec![
            paragraph("intro"),
            bullet("a"),
            bullet("b"),
            paragraph("between"),
            bullet("c"),
        ]);
        let groups: Vec<_> = doc.groups().collect();

        assert_eq!(
            groups,
            vec![
                Group::Single(&doc.blocks()[0]),
                Group::Bullets(vec!["a", "b"]),
                Group::Single(&doc.blocks()[3]),
                Group::Bullets(vec!["c"]),
            ]
        );
    }

    #[test]
    fn groups_are_recomputed_per_walk() {
        let doc = Document::new(vec![bullet("x"), bullet("y")]);
        assert_eq!(doc.groups().count(), 1);
        assert_eq!(doc.groups().count(), 1);
    }

    #[test]
    fn table_helpers() {
        let table = Block::Table {
            rows: vec![
                vec!["a".into(), "b".into()],
                vec!["1".into(), "2".into(), "3".into()],
            ],
        };
        assert_eq!(table.header(), Some(&["a".to_string(), "b".to_string()][..]));
        assert_eq!(table.body().len(), 1);
        assert_eq!(table.column_count(), 3);
        assert_eq!(paragraph("p").column_count(), 0);
    }

    #[test]
    fn link_text_is_its_label() {
        let run = InlineRun::Link {
            label: "docs".into(),
            url: "https://example.com".into(),
        };
        assert_eq!(run.text(), "docs");
    }
}
