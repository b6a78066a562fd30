//! The render capability shared by every output back-end.

use clap::ValueEnum;

use crate::block::Document;
use crate::config::Config;
use crate::docx::DocxRenderer;
use crate::error::RenderError;
use crate::typst::PdfRenderer;

/// Output document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Fixed-size pages (PDF)
    Pdf,
    /// Flowing word-processing document (DOCX)
    Docx,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Docx => "docx",
        }
    }

    /// Build the back-end for this format with the given style palette.
    pub fn renderer(self, config: Config) -> Box<dyn Renderer> {
        match self {
            Format::Pdf => Box::new(PdfRenderer::new(config)),
            Format::Docx => Box::new(DocxRenderer::new(config)),
        }
    }
}

/// Turns a parsed document into the bytes of a finished file.
///
/// Implementations hold only immutable style data, so one renderer can be
/// shared across threads rendering different documents.
pub trait Renderer: Send + Sync {
    fn format(&self) -> Format;

    fn render(&self, doc: &Document) -> Result<Vec<u8>, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_matches_format() {
        for format in [Format::Pdf, Format::Docx] {
            let renderer = format.renderer(Config::compiled_default());
            assert_eq!(renderer.format(), format);
        }
    }

    #[test]
    fn extensions() {
        assert_eq!(Format::Pdf.extension(), "pdf");
        assert_eq!(Format::Docx.extension(), "docx");
    }
}
