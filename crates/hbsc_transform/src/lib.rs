//! Rewrites the inline templates of a host module.
//!
//! Every template site (a `precompileTemplate(...)` call, a `template(...)`
//! call, or a legacy ``hbs`...` `` tag) is handed to a [`TemplateCompiler`]
//! together with a per-site ledger of the names it shares with the host
//! module. The site is then replaced by its compiled form, or by an updated
//! call when the target format is `hbs`.

use fxhash::FxHashMap;
use hbsc_core::{AstPlugin, LegacyModule, TargetFormat, TemplateCompiler};
use serde::Deserialize;
use swc_core::{
    common::{comments::Comments, sync::Lrc, SourceMap},
    ecma::{ast::Module, visit::VisitMutWith},
};
use tracing::debug;

use context::ModuleContext;
use transform::TemplateTransformVisitor;

#[macro_use]
extern crate lazy_static;

pub mod atoms;
pub mod context;
pub mod crawl;
pub mod emit;
pub mod error;
pub mod host_scope;
pub mod imports;
pub mod js_utils;
pub mod modules;
pub mod name;
pub mod options_parser;
pub mod references;
pub mod scope_locals;
pub mod snippets;
pub mod transform;

#[cfg(test)]
mod test_utils;

pub use error::*;
pub use scope_locals::ScopeLocals;

/// `module -> export -> (new export, new module)`
pub type OutputModuleOverrides = FxHashMap<String, FxHashMap<String, (String, String)>>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    pub target_format: TargetFormat,
    /// Legacy template tags to recognize
    pub enable_legacy_modules: Vec<LegacyModule>,
    /// Redirects the imports the output needs
    pub output_module_overrides: OutputModuleOverrides,
    /// Real on-disk filename of the module
    pub filename: String,
    /// Runtime module name, defaults to `filename`
    pub module_name: Option<String>,
}

/// Compiles or rewrites every template site of `module` in place.
///
/// `cm` must be the source map `module` was parsed with, and `comments` the
/// comments the output will be printed with.
/// On error the module is left in an unspecified state.
pub fn transform_module(
    module: &mut Module,
    cm: Lrc<SourceMap>,
    comments: Option<&dyn Comments>,
    options: &TransformOptions,
    compiler: &dyn TemplateCompiler,
    transforms: &mut [Box<dyn AstPlugin>],
) -> Result<(), TransformError> {
    let ctx = ModuleContext::new(module, cm, comments);
    let mut visitor = TemplateTransformVisitor::new(ctx, options, compiler, transforms);
    module.visit_mut_with(&mut visitor);
    let mut ctx = visitor.finish()?;

    // Compiled templates no longer need their tags
    if options.target_format == TargetFormat::Wire {
        for template_module in modules::enabled_modules(&options.enable_legacy_modules) {
            ctx.imports
                .remove_import(template_module.specifier(), template_module.export());
        }
    }

    debug!(filename = options.filename.as_str(), "Transformed module");
    ctx.finish(module);
    Ok(())
}
