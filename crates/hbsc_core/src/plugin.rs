use crate::{
    template::{Template, TemplateScope},
    HbsAtom, JsUtilsError, PluginError,
};

/// A template AST transform.
///
/// Plugins run in registration order during `precompile`/`preprocess`.
/// They may rewrite the template freely, and use [`JsUtils`] to make new host
/// values reachable from it.
pub trait AstPlugin {
    fn name(&self) -> &str;

    fn transform(&mut self, template: &mut Template, jsutils: &mut dyn JsUtils)
        -> Result<(), PluginError>;
}

/// Host-side operations available to plugins.
///
/// Each binding operation takes the template scope at the location where the
/// returned name will be used, so that the name never collides with a block
/// param visible there.
pub trait JsUtils {
    /// Declares `let <name> = <expression>;` in the host module and makes
    /// `name` available to the template.
    fn bind_expression(
        &mut self,
        expression: JsExpression<'_>,
        target: &TemplateScope<'_>,
        name_hint: Option<&str>,
    ) -> Result<HbsAtom, JsUtilsError>;

    /// Makes an export of `module_specifier` available to the template.
    /// Use `"default"` for default exports and `"*"` for the namespace.
    fn bind_import(
        &mut self,
        module_specifier: &str,
        exported_name: &str,
        target: &TemplateScope<'_>,
        name_hint: Option<&str>,
    ) -> HbsAtom;

    /// Adds `import "<module_specifier>";`
    fn import_for_side_effect(&mut self, module_specifier: &str);

    /// Emits `<expression>;` for its side effects. Introduces no binding.
    fn emit_expression(&mut self, expression: JsExpression<'_>) -> Result<(), JsUtilsError>;

    /// Whether `name` is visible in the host scope around the template
    fn has_host_binding(&self, name: &str) -> bool;

    /// Snapshot of the names currently passed to the compiler as locals
    fn locals(&self) -> Vec<HbsAtom>;
}

/// Host expression source given to [`JsUtils`]
pub enum JsExpression<'a> {
    /// Expression source text, e.g. `1 + 1`
    Source(String),
    /// Produces the source text, importing whatever it needs on the way
    Builder(Box<dyn FnOnce(&mut dyn ImportContext) -> String + 'a>),
}

/// Passed to [`JsExpression::Builder`] callbacks
pub trait ImportContext {
    /// Returns the local name under which the export is available at module level
    fn import(&mut self, module_specifier: &str, exported_name: &str, name_hint: Option<&str>)
        -> HbsAtom;
}

impl<'a> JsExpression<'a> {
    pub fn builder<F>(f: F) -> JsExpression<'a>
    where
        F: FnOnce(&mut dyn ImportContext) -> String + 'a,
    {
        JsExpression::Builder(Box::new(f))
    }
}

impl From<&str> for JsExpression<'_> {
    fn from(value: &str) -> Self {
        JsExpression::Source(value.to_owned())
    }
}

impl From<String> for JsExpression<'_> {
    fn from(value: String) -> Self {
        JsExpression::Source(value)
    }
}
