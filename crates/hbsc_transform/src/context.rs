use hbsc_core::HbsAtom;
use swc_core::{
    common::{comments::Comments, sync::Lrc, SourceMap, DUMMY_SP},
    ecma::ast::*,
};
use tracing::debug;

use crate::{
    host_scope::{BindingKind, HostScope},
    imports::ImportUtil,
    references::count_references,
    OutputModuleOverrides,
};

/// State shared by all template sites of one module
pub struct ModuleContext<'c> {
    pub scope: HostScope,
    pub imports: ImportUtil,
    /// Statements placed after the imports, in creation order
    pub injected: Vec<Stmt>,
    pub cm: Lrc<SourceMap>,
    pub comments: Option<&'c dyn Comments>,
}

impl<'c> ModuleContext<'c> {
    pub fn new(
        module: &Module,
        cm: Lrc<SourceMap>,
        comments: Option<&'c dyn Comments>,
    ) -> ModuleContext<'c> {
        let mut scope = HostScope::default();
        scope.declare_module(module);

        ModuleContext {
            scope,
            imports: ImportUtil::new(module, count_references(module)),
            injected: Vec::new(),
            cm,
            comments,
        }
    }

    /// Whether a new module-level binding named `name` would collide with
    /// something visible at the current position
    pub fn is_name_taken(&self, name: &str) -> bool {
        self.scope.has_binding(name) || self.imports.is_free_global(name)
    }

    pub fn import(&mut self, source: &str, imported: &str, name_hint: Option<&str>) -> HbsAtom {
        self.imports
            .import(&mut self.scope, source, imported, name_hint)
    }

    /// Imports one of the runtime functions the output calls, honoring the overrides.
    /// The returned identifier is expected to be written into the output.
    pub fn import_runtime(
        &mut self,
        overrides: &OutputModuleOverrides,
        source: &str,
        imported: &str,
        name_hint: &str,
    ) -> Ident {
        let (source, imported) = match overrides
            .get(source)
            .and_then(|exports| exports.get(imported))
        {
            Some((new_imported, new_source)) => (new_source.as_str(), new_imported.as_str()),
            None => (source, imported),
        };

        let local = self.import(source, imported, Some(name_hint));
        self.imports.add_reference(&local);
        Ident::new_no_ctxt(local, DUMMY_SP)
    }

    /// Adds `let <name> = <init>;` after the imports
    pub fn inject_binding(&mut self, name: HbsAtom, init: Box<Expr>) {
        debug!(name = &*name, "Injecting binding");
        self.scope.declare_at_module(name.clone(), BindingKind::Local);

        self.injected.push(Stmt::Decl(Decl::Var(Box::new(VarDecl {
            span: DUMMY_SP,
            ctxt: Default::default(),
            kind: VarDeclKind::Let,
            declare: false,
            decls: vec![VarDeclarator {
                span: DUMMY_SP,
                name: Pat::Ident(Ident::new_no_ctxt(name, DUMMY_SP).into()),
                init: Some(init),
                definite: false,
            }],
        }))));
    }

    /// Adds `<expr>;` after the imports
    pub fn inject_expression(&mut self, expr: Box<Expr>) {
        debug!("Injecting expression statement");
        self.injected.push(Stmt::Expr(ExprStmt {
            span: DUMMY_SP,
            expr,
        }));
    }

    /// Writes the collected imports and statements into the module
    pub fn finish(self, module: &mut Module) {
        let ModuleContext {
            imports, injected, ..
        } = self;
        imports.apply(module, injected);
    }
}
