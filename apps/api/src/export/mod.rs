// Export pipeline: Document → LaTeX source → PDF.

pub mod compiler;
pub mod handlers;
pub mod latex;
pub mod template;

pub use compiler::{LatexCompiler, PdfCompiler};
