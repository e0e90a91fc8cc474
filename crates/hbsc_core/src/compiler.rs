use serde_json::{Map, Value};

use crate::{template::Template, AstPlugin, CompilerError, HbsAtom, JsUtils};

/// The template compiler used by the transform.
///
/// `hbsc_syntax` provides the reference implementation, but any backend
/// producing a host-language expression can be plugged in.
pub trait TemplateCompiler {
    /// Compiles the template to the source of a host expression.
    /// Must run `options.plugins` before reading `options.jsutils.locals()`.
    fn precompile(&self, template: &str, options: &mut CompileOptions<'_>)
        -> Result<String, CompilerError>;

    /// Parses the template and runs the plugins on it
    fn preprocess(
        &self,
        template: &str,
        options: &mut CompileOptions<'_>,
    ) -> Result<Template, CompilerError>;

    /// Prints a template back to text
    fn print(&self, template: &Template) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    Precompile,
    /// Keep the template as close to the source as possible
    Codemod,
}

/// Everything a compiler needs for a single template site
pub struct CompileOptions<'a> {
    /// Original template text
    pub contents: &'a str,
    /// Runtime module name of the template
    pub module_name: &'a str,
    /// Real on-disk filename
    pub filename: &'a str,
    pub strict_mode: bool,
    pub mode: CompileMode,
    /// Static options from the template site, forwarded verbatim
    pub user_options: &'a Map<String, Value>,
    /// User transforms first, the scope crawler last
    pub plugins: Vec<&'a mut dyn AstPlugin>,
    pub jsutils: &'a mut dyn JsUtils,
}

impl CompileOptions<'_> {
    /// Runs every plugin on `template` in order
    pub fn run_plugins(&mut self, template: &mut Template) -> Result<(), CompilerError> {
        for plugin in self.plugins.iter_mut() {
            plugin.transform(template, &mut *self.jsutils)?;
        }
        Ok(())
    }

    /// Locals after all the plugins ran
    pub fn locals(&self) -> Vec<HbsAtom> {
        self.jsutils.locals()
    }
}
