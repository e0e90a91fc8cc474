use hbsc_core::{template::Template, CompileOptions, CompilerError, TemplateCompiler};
use hbsc_syntax::GlimmerCompiler;
use serde_json::Value;

/// Precompiles to `{ template: "<printed>", scope: () => [...], moduleName, isStrictMode }`.
/// Same parsing and plugin handling as [`GlimmerCompiler`], but readable output.
pub struct PrintingCompiler;

impl TemplateCompiler for PrintingCompiler {
    fn precompile(
        &self,
        template: &str,
        options: &mut CompileOptions<'_>,
    ) -> Result<String, CompilerError> {
        let parsed = GlimmerCompiler.preprocess(template, options)?;
        let locals = options.locals();

        let mut out = format!(
            "{{ template: {}",
            Value::String(GlimmerCompiler.print(&parsed))
        );
        if !locals.is_empty() {
            let names: Vec<&str> = locals.iter().map(|local| &**local).collect();
            out.push_str(&format!(", scope: () => [{}]", names.join(", ")));
        }
        out.push_str(&format!(
            ", moduleName: {}, isStrictMode: {} }}",
            Value::String(options.module_name.to_owned()),
            options.strict_mode
        ));
        Ok(out)
    }

    fn preprocess(
        &self,
        template: &str,
        options: &mut CompileOptions<'_>,
    ) -> Result<Template, CompilerError> {
        GlimmerCompiler.preprocess(template, options)
    }

    fn print(&self, template: &Template) -> String {
        GlimmerCompiler.print(template)
    }
}
