//! Errors surfaced by a single render call.
//!
//! Parsing has no error type: malformed markdown is always absorbed into
//! some document. Only the layout/export step can fail.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The generated Typst markup was rejected by the compiler.
    #[error("Typst compilation failed: {0}")]
    Compile(String),

    /// The laid-out pages could not be exported as PDF.
    #[error("PDF generation failed: {0}")]
    Export(String),

    /// The word-processing document could not be packaged.
    #[error("DOCX packaging failed: {0}")]
    Package(String),
}
