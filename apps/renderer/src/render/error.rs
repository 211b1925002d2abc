use thiserror::Error;

/// Failures of a single render call. Missing data is never an error: it
/// renders as empty text or an omitted block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The stored `renderEngine` tag is not one of `html`, `builder`, `canvas`.
    #[error("unsupported render mode: {0:?}")]
    UnsupportedRenderMode(String),

    /// The markup cannot be expanded: unbalanced block tags, bad expression
    /// syntax, or a call to a helper the expander does not know.
    #[error("template syntax error: {0}")]
    TemplateSyntax(String),
}
