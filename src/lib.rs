mod block;
mod config;
mod docx;
mod error;
mod format;
mod inline;
mod parser;
mod reflow;
mod typst;

pub use block::{Block, Document, Group, Groups, HeadingLevel, InlineRun};
pub use config::{Color, Config, ConfigError};
pub use docx::{DocxRenderer, blocks_to_docx};
pub use error::RenderError;
pub use format::{Format, Renderer};
pub use inline::{normalize, scan};
pub use reflow::reflow;
pub use typst::{PdfRenderer, blocks_to_typst};

/// Parse markdown text into a document.
pub fn parse(markdown: &str) -> Document {
    parser::parse(markdown)
}

/// Convert markdown to Typst markup.
pub fn markdown_to_typst(markdown: &str) -> String {
    markdown_to_typst_with_config(markdown, &Config::compiled_default())
}

pub fn markdown_to_typst_with_config(markdown: &str, config: &Config) -> String {
    typst::blocks_to_typst(&parse(markdown), config)
}

/// Convert markdown to PDF bytes.
pub fn markdown_to_pdf(markdown: &str) -> Result<Vec<u8>, RenderError> {
    markdown_to_pdf_with_config(markdown, Config::compiled_default())
}

pub fn markdown_to_pdf_with_config(markdown: &str, config: Config) -> Result<Vec<u8>, RenderError> {
    PdfRenderer::new(config).render(&parse(markdown))
}

/// Convert markdown to DOCX bytes.
pub fn markdown_to_docx(markdown: &str) -> Result<Vec<u8>, RenderError> {
    markdown_to_docx_with_config(markdown, Config::compiled_default())
}

pub fn markdown_to_docx_with_config(
    markdown: &str,
    config: Config,
) -> Result<Vec<u8>, RenderError> {
    DocxRenderer::new(config).render(&parse(markdown))
}
