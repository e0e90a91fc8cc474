//! Mock template transforms and output helpers shared by the end-to-end tests

#![allow(dead_code)]

use hbsc::{
    template::{builders, visit::*, Expression, PathExpression, Template, TemplateScope},
    AstPlugin, HbsAtom, JsExpression, JsUtils, PluginError,
};
use swc_core::common::{sync::Lrc, FileName, SourceMap};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter, Node};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};

/// Parses `code` and prints it back minified, so that formatting and raw
/// literal text do not matter in comparisons
pub fn normalized(code: &str) -> String {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Anon.into(), code.to_owned());
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        Default::default(),
        StringInput::from(&*fm),
        None,
    );
    let module = Parser::new_from(lexer).parse_module().unwrap();

    let mut buff: Vec<u8> = Vec::with_capacity(128);
    let writer: JsWriter<&mut Vec<u8>> = JsWriter::new(cm.clone(), "\n", &mut buff, None);
    let mut emitter_cfg = swc_ecma_codegen::Config::default();
    emitter_cfg.minify = true;

    let mut emitter = Emitter {
        cfg: emitter_cfg,
        comments: None,
        wr: writer,
        cm,
    };
    module.emit_with(&mut emitter).unwrap();

    String::from_utf8(buff).unwrap()
}

/// `{{red}}` becomes `{{"#ff0000"}}`
pub struct ColorRewriter;

impl AstPlugin for ColorRewriter {
    fn name(&self) -> &str {
        "color"
    }

    fn transform(&mut self, template: &mut Template, _jsutils: &mut dyn JsUtils) -> VisitResult {
        ColorVisitor.visit_mut_template(template)
    }
}

struct ColorVisitor;

impl VisitMut for ColorVisitor {
    fn visit_mut_expression(&mut self, n: &mut Expression, scope: &TemplateScope<'_>) -> VisitResult {
        if let Expression::Path(ref path) = n {
            if path.original() == "red" && !scope.has_binding("red") {
                *n = builders::string("#ff0000");
                return Ok(());
            }
        }
        walk_expression(self, n, scope)
    }
}

type Bind = fn(&mut dyn JsUtils, &TemplateScope<'_>) -> Result<HbsAtom, PluginError>;

/// Replaces `{{onePlusOne}}` with a host value
struct OnePlusOne<'j> {
    jsutils: &'j mut dyn JsUtils,
    bind: Bind,
}

impl VisitMut for OnePlusOne<'_> {
    fn visit_mut_path(&mut self, n: &mut PathExpression, scope: &TemplateScope<'_>) -> VisitResult {
        if n.original() == "onePlusOne" {
            let name = (self.bind)(&mut *self.jsutils, scope)?;
            *n = builders::path_expression(&name);
        }
        Ok(())
    }
}

fn bind_expression(jsutils: &mut dyn JsUtils, scope: &TemplateScope<'_>) -> Result<HbsAtom, PluginError> {
    Ok(jsutils.bind_expression("1+1".into(), scope, Some("two"))?)
}

fn bind_import(jsutils: &mut dyn JsUtils, scope: &TemplateScope<'_>) -> Result<HbsAtom, PluginError> {
    Ok(jsutils.bind_import("my-library", "default", scope, Some("two")))
}

/// Binds `1+1` for every `{{onePlusOne}}`
pub struct ExpressionInjector;

impl AstPlugin for ExpressionInjector {
    fn name(&self) -> &str {
        "expression-injector"
    }

    fn transform(&mut self, template: &mut Template, jsutils: &mut dyn JsUtils) -> VisitResult {
        OnePlusOne {
            jsutils,
            bind: bind_expression,
        }
        .visit_mut_template(template)
    }
}

/// Binds the default export of `my-library` for every `{{onePlusOne}}`
pub struct ImportInjector;

impl AstPlugin for ImportInjector {
    fn name(&self) -> &str {
        "import-injector"
    }

    fn transform(&mut self, template: &mut Template, jsutils: &mut dyn JsUtils) -> VisitResult {
        OnePlusOne {
            jsutils,
            bind: bind_import,
        }
        .visit_mut_template(template)
    }
}

/// Binds `DateTime.now()` for every `{{now}}`, importing `DateTime` on the way
pub struct ClockInjector;

impl AstPlugin for ClockInjector {
    fn name(&self) -> &str {
        "clock-injector"
    }

    fn transform(&mut self, template: &mut Template, jsutils: &mut dyn JsUtils) -> VisitResult {
        ClockVisitor { jsutils }.visit_mut_template(template)
    }
}

struct ClockVisitor<'j> {
    jsutils: &'j mut dyn JsUtils,
}

impl VisitMut for ClockVisitor<'_> {
    fn visit_mut_path(&mut self, n: &mut PathExpression, scope: &TemplateScope<'_>) -> VisitResult {
        if n.original() == "now" && !scope.has_binding("now") {
            let expression = JsExpression::builder(|ctx| {
                let date_time = ctx.import("luxon", "DateTime", None);
                format!("{}.now()", date_time)
            });
            let name = self.jsutils.bind_expression(expression, scope, Some("now"))?;
            *n = builders::path_expression(&name);
        }
        Ok(())
    }
}

/// Imports a module and calls a function for every template it sees
pub struct SideEffectEmitter;

impl AstPlugin for SideEffectEmitter {
    fn name(&self) -> &str {
        "side-effects"
    }

    fn transform(&mut self, _template: &mut Template, jsutils: &mut dyn JsUtils) -> VisitResult {
        jsutils.import_for_side_effect("setup-the-things");
        jsutils.emit_expression("registerTemplate()".into())?;
        Ok(())
    }
}

pub struct FailingTransform;

impl AstPlugin for FailingTransform {
    fn name(&self) -> &str {
        "failing"
    }

    fn transform(&mut self, _template: &mut Template, _jsutils: &mut dyn JsUtils) -> VisitResult {
        Err(PluginError::custom("failing", "this transform always fails"))
    }
}
