use thiserror::Error;

/// An expression handed to [`crate::JsUtils`] could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsUtilsError {
    #[error("JSUtils.{api} could not understand the expression: {source_text}")]
    Unparseable {
        api: &'static str,
        source_text: String,
    },

    #[error("JSUtils.{api} expected to find exactly one expression but found {found} in: {source_text}")]
    NotSingleExpression {
        api: &'static str,
        found: usize,
        source_text: String,
    },

    #[error("JSUtils.{api} expected to find an expression but found {found} in: {source_text}")]
    NotAnExpression {
        api: &'static str,
        found: &'static str,
        source_text: String,
    },
}

/// Failure of a template AST plugin. Aborts the compilation of the whole unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error(transparent)]
    JsUtils(#[from] JsUtilsError),

    #[error("{plugin}: {message}")]
    Custom { plugin: String, message: String },
}

/// Failure of the template compiler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilerError {
    /// The template text is malformed
    #[error("{message} (at offset {offset} of the template)")]
    Syntax { message: String, offset: u32 },

    /// One of the AST plugins failed
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Any other failure reported by a compiler backend
    #[error("{0}")]
    Other(String),
}

impl PluginError {
    pub fn custom(plugin: impl Into<String>, message: impl Into<String>) -> PluginError {
        PluginError::Custom {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

impl CompilerError {
    /// The bare failure text, without the plugin name or template offset
    pub fn message(&self) -> String {
        match self {
            CompilerError::Syntax { message, .. } => message.clone(),
            CompilerError::Plugin(PluginError::Custom { message, .. }) => message.clone(),
            CompilerError::Plugin(PluginError::JsUtils(error)) => error.to_string(),
            CompilerError::Other(message) => message.clone(),
        }
    }
}
