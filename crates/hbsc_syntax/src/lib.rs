//! Reference template compiler for `hbsc`.
//!
//! Parses the Handlebars/Glimmer subset described by [`hbsc_core::template`],
//! prints it back to text and encodes it to the wire format.
//!
//! ```
//! use hbsc_syntax::{parse_template, print_template};
//!
//! let template = parse_template("<Greeting @name={{name}} />").unwrap();
//! assert_eq!(print_template(&template), "<Greeting @name={{name}} />");
//! ```

mod error;
mod parser;
mod precompile;
mod printer;

use hbsc_core::{template::Template, CompileOptions, CompilerError, TemplateCompiler};
use tracing::debug;

pub use error::*;
pub use parser::{parse_template, VOID_ELEMENTS};
pub use precompile::WireTemplate;
pub use printer::print_template;

/// [`TemplateCompiler`] backed by this crate
#[derive(Debug, Default, Clone, Copy)]
pub struct GlimmerCompiler;

impl TemplateCompiler for GlimmerCompiler {
    fn precompile(
        &self,
        template: &str,
        options: &mut CompileOptions<'_>,
    ) -> Result<String, CompilerError> {
        let mut parsed = parse_template(template)?;
        options.run_plugins(&mut parsed)?;

        let locals = options.locals();
        debug!(
            module_name = options.module_name,
            locals = locals.len(),
            "Precompiling template"
        );

        Ok(WireTemplate {
            template: &parsed,
            contents: options.contents,
            locals: &locals,
            module_name: options.module_name,
            strict_mode: options.strict_mode,
        }
        .to_source())
    }

    fn preprocess(
        &self,
        template: &str,
        options: &mut CompileOptions<'_>,
    ) -> Result<Template, CompilerError> {
        let mut parsed = parse_template(template)?;
        options.run_plugins(&mut parsed)?;
        Ok(parsed)
    }

    fn print(&self, template: &Template) -> String {
        print_template(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbsc_core::{
        hbs_atom,
        template::{builders, visit::*, *},
        AstPlugin, CompileMode, HbsAtom, JsExpression, JsUtils, JsUtilsError,
        PluginError,
    };
    use serde_json::Map;

    /// Records locals in the order they are bound
    #[derive(Default)]
    struct RecordingUtils {
        locals: Vec<HbsAtom>,
    }

    impl JsUtils for RecordingUtils {
        fn bind_expression(
            &mut self,
            _expression: JsExpression<'_>,
            _target: &TemplateScope<'_>,
            name_hint: Option<&str>,
        ) -> Result<HbsAtom, JsUtilsError> {
            let name = HbsAtom::from(name_hint.unwrap_or("value"));
            self.locals.push(name.clone());
            Ok(name)
        }

        fn bind_import(
            &mut self,
            _module_specifier: &str,
            exported_name: &str,
            _target: &TemplateScope<'_>,
            _name_hint: Option<&str>,
        ) -> HbsAtom {
            let name = HbsAtom::from(exported_name);
            self.locals.push(name.clone());
            name
        }

        fn import_for_side_effect(&mut self, _module_specifier: &str) {}

        fn emit_expression(&mut self, _expression: JsExpression<'_>) -> Result<(), JsUtilsError> {
            Ok(())
        }

        fn has_host_binding(&self, _name: &str) -> bool {
            false
        }

        fn locals(&self) -> Vec<HbsAtom> {
            self.locals.clone()
        }
    }

    /// Replaces `{{greeting}}` with an imported helper call
    struct Greeting;

    impl AstPlugin for Greeting {
        fn name(&self) -> &str {
            "greeting"
        }

        fn transform(&mut self, template: &mut Template, jsutils: &mut dyn JsUtils) -> VisitResult {
            struct Visitor<'j>(&'j mut dyn JsUtils);

            impl VisitMut for Visitor<'_> {
                fn visit_mut_path(
                    &mut self,
                    n: &mut PathExpression,
                    scope: &TemplateScope<'_>,
                ) -> VisitResult {
                    if n.head_name() == Some("greeting") {
                        let name = self.0.bind_import("my-greetings", "hello", scope, None);
                        *n = builders::path_expression(&name);
                    }
                    Ok(())
                }
            }

            Visitor(jsutils).visit_mut_template(template)
        }
    }

    struct Failing;

    impl AstPlugin for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn transform(&mut self, _: &mut Template, _: &mut dyn JsUtils) -> VisitResult {
            Err(PluginError::custom("failing", "always fails"))
        }
    }

    fn options<'a>(
        contents: &'a str,
        user_options: &'a Map<String, serde_json::Value>,
        plugins: Vec<&'a mut dyn AstPlugin>,
        jsutils: &'a mut dyn JsUtils,
    ) -> CompileOptions<'a> {
        CompileOptions {
            contents,
            module_name: "app/templates/foo.hbs",
            filename: "app/templates/foo.js",
            strict_mode: true,
            mode: CompileMode::Precompile,
            user_options,
            plugins,
            jsutils,
        }
    }

    #[test]
    fn it_reads_locals_after_plugins() {
        let user_options = Map::new();
        let mut utils = RecordingUtils::default();
        let mut greeting = Greeting;
        let mut options = options("{{greeting}}", &user_options, vec![&mut greeting], &mut utils);

        let compiled = GlimmerCompiler
            .precompile("{{greeting}}", &mut options)
            .expect("should compile");

        assert!(compiled.contains("scope: () => [hello]"));
        assert!(compiled.contains("isStrictMode: true"));
        assert!(compiled.contains(r#"[32,0]"#));
    }

    #[test]
    fn it_preprocesses_without_encoding() {
        let user_options = Map::new();
        let mut utils = RecordingUtils::default();
        let mut greeting = Greeting;
        let mut options = options("", &user_options, vec![&mut greeting], &mut utils);

        let template = GlimmerCompiler
            .preprocess("<p>{{greeting}}</p>", &mut options)
            .expect("should preprocess");

        assert_eq!(GlimmerCompiler.print(&template), "<p>{{hello}}</p>");
        assert_eq!(utils.locals, vec![hbs_atom!("hello")]);
    }

    #[test]
    fn it_propagates_plugin_errors() {
        let user_options = Map::new();
        let mut utils = RecordingUtils::default();
        let mut failing = Failing;
        let mut options = options("", &user_options, vec![&mut failing], &mut utils);

        let err = GlimmerCompiler
            .precompile("hello", &mut options)
            .expect_err("should fail");
        assert_eq!(err.to_string(), "failing: always fails");
    }

    #[test]
    fn it_reports_syntax_errors() {
        let user_options = Map::new();
        let mut utils = RecordingUtils::default();
        let mut options = options("", &user_options, vec![], &mut utils);

        let err = GlimmerCompiler
            .precompile("<div>", &mut options)
            .expect_err("should fail");
        assert!(matches!(err, CompilerError::Syntax { .. }));
    }
}
