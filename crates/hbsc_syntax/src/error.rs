use hbsc_core::CompilerError;
use swc_core::common::{BytePos, Span, Spanned};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Offsets within the template text
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("Unexpected end of template")]
    UnexpectedEof,
    #[error("Expected `{0}`")]
    Expected(&'static str),
    #[error("Unclosed element `{0}`")]
    UnclosedElement(String),
    #[error("Closing tag `{found}` did not match last open tag `{expected}`")]
    MismatchedCloseTag { expected: String, found: String },
    #[error("Closing tag `{0}` without an open tag")]
    UnexpectedCloseTag(String),
    #[error("Unclosed block `{0}`")]
    UnclosedBlock(String),
    #[error("`{found}` doesn't match `{expected}`")]
    MismatchedCloseBlock { expected: String, found: String },
    #[error("Unexpected `{0}` outside of a block")]
    UnexpectedBlockPart(&'static str),
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Invalid block params")]
    InvalidBlockParams,
    #[error("Expected an expression")]
    ExpectedExpression,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, lo: usize, hi: usize) -> ParseError {
        ParseError {
            kind,
            span: Span::new(BytePos(lo as u32), BytePos(hi as u32)),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.kind, self.span.lo.0)
    }
}

impl std::error::Error for ParseError {}

impl Spanned for ParseError {
    fn span(&self) -> Span {
        self.span
    }
}

impl From<ParseError> for CompilerError {
    fn from(value: ParseError) -> Self {
        CompilerError::Syntax {
            message: value.kind.to_string(),
            offset: value.span.lo.0,
        }
    }
}
