//! Error definitions for the glue code of `hbsc`

use hbsc_transform::TransformError;
use swc_core::common::{Span, Spanned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// The host module is not valid JavaScript/TypeScript
    #[error("{message}")]
    Parse { span: Span, message: String },

    /// A template site could not be compiled
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("failed to print the module: {0}")]
    Emit(#[from] std::io::Error),
}

impl From<swc_ecma_parser::error::Error> for CompileError {
    fn from(value: swc_ecma_parser::error::Error) -> CompileError {
        let span = value.span();

        CompileError::Parse {
            span,
            message: value.into_kind().msg().into_owned(),
        }
    }
}

impl Spanned for CompileError {
    fn span(&self) -> Span {
        match self {
            CompileError::Parse { span, .. } => *span,
            CompileError::Transform(e) => e.span(),
            CompileError::Emit(_) => Span::default(),
        }
    }
}
