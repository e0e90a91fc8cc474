//! The host-side API given to template plugins for one template site.

use std::{cell::RefCell, rc::Rc};

use hbsc_core::{
    template::TemplateScope, HbsAtom, ImportContext, JsExpression, JsUtils, JsUtilsError,
};
use swc_core::{common::DUMMY_SP, ecma::ast::*};
use tracing::trace;

use crate::{
    context::ModuleContext,
    name::{identifier_like, unused_name_like},
    scope_locals::ScopeLocals,
    snippets::parse_injected_expression,
};

pub struct SiteJsUtils<'s, 'c> {
    locals: Rc<RefCell<ScopeLocals>>,
    ctx: &'s mut ModuleContext<'c>,
}

impl<'s, 'c> SiteJsUtils<'s, 'c> {
    pub fn new(locals: Rc<RefCell<ScopeLocals>>, ctx: &'s mut ModuleContext<'c>) -> Self {
        SiteJsUtils { locals, ctx }
    }

    fn source_text(&mut self, expression: JsExpression<'_>) -> String {
        match expression {
            JsExpression::Source(source_text) => source_text,
            JsExpression::Builder(build) => build(self),
        }
    }
}

impl JsUtils for SiteJsUtils<'_, '_> {
    fn bind_expression(
        &mut self,
        expression: JsExpression<'_>,
        target: &TemplateScope<'_>,
        name_hint: Option<&str>,
    ) -> Result<HbsAtom, JsUtilsError> {
        let source_text = self.source_text(expression);
        let expr = parse_injected_expression(&self.ctx.cm, &source_text, "bindExpression")?;

        let desired = identifier_like(name_hint.unwrap_or("a"));
        let name = {
            let locals = self.locals.borrow();
            let ctx = &*self.ctx;
            unused_name_like(&desired, |candidate| {
                ctx.is_name_taken(candidate)
                    || locals.has(candidate)
                    || target.has_binding(candidate)
            })
        };

        self.ctx.inject_binding(name.clone(), expr);
        self.locals.borrow_mut().add(name.clone(), None);
        trace!(name = &*name, "Bound expression");
        Ok(name)
    }

    fn bind_import(
        &mut self,
        module_specifier: &str,
        exported_name: &str,
        target: &TemplateScope<'_>,
        name_hint: Option<&str>,
    ) -> HbsAtom {
        let imported = self.ctx.import(module_specifier, exported_name, name_hint);

        let name = {
            let locals = self.locals.borrow();
            if locals.has(&imported) && !target.has_binding(&imported) {
                return imported;
            }

            // A second binding keeps the import itself untouched
            let ctx = &*self.ctx;
            unused_name_like(&imported, |candidate| {
                locals.has(candidate)
                    || target.has_binding(candidate)
                    || (candidate != &*imported && ctx.is_name_taken(candidate))
            })
        };

        if name != imported {
            self.ctx.imports.add_reference(&imported);
            let init = Box::new(Expr::Ident(Ident::new_no_ctxt(imported.clone(), DUMMY_SP)));
            self.ctx.inject_binding(name.clone(), init);
        }

        self.locals.borrow_mut().add(name.clone(), None);
        name
    }

    fn import_for_side_effect(&mut self, module_specifier: &str) {
        self.ctx.imports.import_for_side_effect(module_specifier);
    }

    fn emit_expression(&mut self, expression: JsExpression<'_>) -> Result<(), JsUtilsError> {
        let source_text = self.source_text(expression);
        let expr = parse_injected_expression(&self.ctx.cm, &source_text, "emitExpression")?;
        self.ctx.inject_expression(expr);
        Ok(())
    }

    fn has_host_binding(&self, name: &str) -> bool {
        self.ctx.scope.has_binding(name)
    }

    fn locals(&self) -> Vec<HbsAtom> {
        self.locals.borrow().locals().to_vec()
    }
}

impl ImportContext for SiteJsUtils<'_, '_> {
    fn import(
        &mut self,
        module_specifier: &str,
        exported_name: &str,
        name_hint: Option<&str>,
    ) -> HbsAtom {
        let local = self.ctx.import(module_specifier, exported_name, name_hint);
        self.ctx.imports.add_reference(&local);
        local
    }
}
