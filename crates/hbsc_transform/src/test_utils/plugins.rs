use hbsc_core::{
    template::{builders, visit::*, PathExpression, Template, TemplateScope},
    AstPlugin, HbsAtom, JsUtils, PluginError,
};

type Replace = fn(&mut dyn JsUtils, &TemplateScope<'_>) -> Result<HbsAtom, PluginError>;

/// Replaces every `{{onePlusOne}}` path with the name returned by `replace`
struct OnePlusOne<'j> {
    jsutils: &'j mut dyn JsUtils,
    replace: Replace,
}

impl VisitMut for OnePlusOne<'_> {
    fn visit_mut_path(&mut self, n: &mut PathExpression, scope: &TemplateScope<'_>) -> VisitResult {
        if n.original() == "onePlusOne" {
            let name = (self.replace)(&mut *self.jsutils, scope)?;
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
            replace: bind_expression,
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
            replace: bind_import,
        }
        .visit_mut_template(template)
    }
}
