use hbsc_core::{CompilerError, PluginError};
use swc_core::common::{Span, Spanned};
use thiserror::Error;

/// Fatal failure while transforming a module.
/// The first one aborts the whole unit.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A template site has a shape which cannot be analyzed statically
    #[error(transparent)]
    Site(#[from] TemplateSiteError),

    /// The template compiler rejected a template
    #[error("{error}")]
    Compiler { span: Span, error: CompilerError },

    /// A template AST plugin failed
    #[error("{error}")]
    Plugin { span: Span, error: PluginError },
}

impl TransformError {
    /// Attributes a compiler failure to the template site at `span`
    pub fn from_compiler(error: CompilerError, span: Span) -> TransformError {
        match error {
            CompilerError::Plugin(error) => TransformError::Plugin { span, error },
            error => TransformError::Compiler { span, error },
        }
    }
}

impl Spanned for TransformError {
    fn span(&self) -> Span {
        match self {
            TransformError::Site(e) => e.span,
            TransformError::Compiler { span, .. } => *span,
            TransformError::Plugin { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct TemplateSiteError {
    pub span: Span,
    pub kind: TemplateSiteErrorKind,
}

impl TemplateSiteError {
    pub fn new(span: Span, kind: TemplateSiteErrorKind) -> TemplateSiteError {
        TemplateSiteError { span, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateSiteErrorKind {
    /// Tagged template usage of a callee which only supports the call form
    #[error("Attempted to use `{0}` as a template tag, but it can only be called as a function with a string passed to it: {0}('content here')")]
    TemplateTagNotAllowed(String),
    #[error("placeholders inside a tagged template string are not supported")]
    TaggedTemplatePlaceholders,
    #[error("placeholders inside a template string are not supported")]
    TemplateStringPlaceholders,
    #[error("tagged template strings inside {0} are not supported")]
    NestedTaggedTemplate(String),
    #[error("{0} should be invoked with at least a single argument (the template string)")]
    MissingTemplateString(String),
    #[error("{0} can only be invoked with 2 arguments: the template string, and any static options")]
    TooManyArguments(String),

    // Static options
    #[error("{0} does not allow spread element")]
    OptionsSpread(String),
    #[error("{0} can only accept static property names")]
    OptionsNonStaticKey(String),
    #[error("{invoked} can only accept static options but you passed {found}")]
    NonStaticOption { invoked: String, found: &'static str },
    #[error("spread element is not allowed here")]
    ArraySpread,
    #[error("{invoked} does not accept a method for {property}")]
    OptionMethod { invoked: String, property: String },

    // `scope`
    #[error("Passing an object as the `scope` property to inline templates is no longer supported. Please pass a function that returns an object expression instead.")]
    ScopeObjectLiteral,
    #[error("Scope functions must have a single return statement which returns an object expression containing references to in-scope values")]
    ScopeReturnCount,
    #[error("Scope objects for `{0}` must be an object expression containing only references to in-scope values, or a function that returns an object expression containing only references to in-scope values")]
    ScopeNotObject(String),
    #[error("Scope objects for `{0}` may not contain spread elements")]
    ScopeSpread(String),
    #[error("Scope objects for `{0}` may not contain methods")]
    ScopeMethod(String),
    #[error("Scope objects for `{0}` may only contain static property names")]
    ScopeNonStaticKey(String),
    #[error("Scope objects for `{invoked}` may only contain direct references to in-scope values, e.g. {{ {key} }} or {{ {key}: {key} }}. Found {found}")]
    ScopeNotReference {
        invoked: String,
        key: String,
        found: &'static str,
    },

    // `eval`
    #[error("unsupported syntax for `eval` parameter to `{0}`. It must be an object method or a function.")]
    EvalSyntax(String),
    #[error("eval function must have a single return statement")]
    EvalReturnCount,
    #[error("eval function must return `eval(arguments[0])`. Found non-CallExpression.")]
    EvalNotCall,
    #[error("eval function must return `eval(arguments[0])`. Found callee is not eval.")]
    EvalCallee,
    #[error("eval function must return `eval(arguments[0])`. Found incorrect number of arguments.")]
    EvalArgumentCount,
    #[error("eval function must return `eval(arguments[0])`. Found argument is non-MemberExpression.")]
    EvalArgumentNotMember,
    #[error("eval function must return `eval(arguments[0])`. Found wrong argument to eval.")]
    EvalWrongObject,
    #[error("eval function must return `eval(arguments[0])`. Found wrong property.")]
    EvalWrongProperty,

    #[error("insertRuntimeErrors cannot be used with {0}")]
    RuntimeErrorsWithRfc931(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_core::common::DUMMY_SP;

    #[test]
    fn it_formats_site_errors() {
        let err = TemplateSiteError::new(
            DUMMY_SP,
            TemplateSiteErrorKind::ScopeNotReference {
                invoked: "precompileTemplate".into(),
                key: "bar".into(),
                found: "NumericLiteral",
            },
        );
        assert_eq!(
            err.to_string(),
            "Scope objects for `precompileTemplate` may only contain direct references to in-scope values, e.g. { bar } or { bar: bar }. Found NumericLiteral"
        );

        let err = TemplateSiteErrorKind::TemplateTagNotAllowed("precompileTemplate".into());
        assert_eq!(
            err.to_string(),
            "Attempted to use `precompileTemplate` as a template tag, but it can only be called as a function with a string passed to it: precompileTemplate('content here')"
        );
    }

    #[test]
    fn it_attributes_plugin_failures() {
        let err = TransformError::from_compiler(
            CompilerError::Plugin(PluginError::custom("color", "boom")),
            DUMMY_SP,
        );
        assert!(matches!(err, TransformError::Plugin { .. }));
        assert_eq!(err.to_string(), "color: boom");
    }
}
