//! Pre-pass counting how often each module-level import is referenced.

use fxhash::{FxHashMap, FxHashSet};
use hbsc_core::HbsAtom;
use swc_core::ecma::{
    ast::*,
    visit::{Visit, VisitWith},
};

use crate::host_scope::*;

#[derive(Debug, Default)]
pub struct ReferenceCounts {
    /// Keyed by the local name of the import
    pub imports: FxHashMap<HbsAtom, usize>,
    /// Names referenced without any binding in the unit
    pub free_globals: FxHashSet<HbsAtom>,
}

pub fn count_references(module: &Module) -> ReferenceCounts {
    let mut scope = HostScope::default();
    scope.declare_module(module);

    let mut counter = ReferenceCounter {
        scope,
        counts: ReferenceCounts::default(),
    };
    module.visit_with(&mut counter);
    counter.counts
}

struct ReferenceCounter {
    scope: HostScope,
    counts: ReferenceCounts,
}

impl ReferenceCounter {
    fn reference(&mut self, name: &HbsAtom) {
        match self.scope.resolve(name) {
            Some((BindingKind::Import { .. }, true)) => {
                *self.counts.imports.entry(name.clone()).or_default() += 1;
            }
            Some(_) => {}
            None => {
                self.counts.free_globals.insert(name.clone());
            }
        }
    }

    fn with_frame(&mut self, names: Vec<HbsAtom>, f: impl FnOnce(&mut Self)) {
        self.scope.push_frame(names);
        f(self);
        self.scope.pop_frame();
    }

    fn with_this(&mut self, may_use_lexical_this: bool, f: impl FnOnce(&mut Self)) {
        self.scope.push_this(may_use_lexical_this);
        f(self);
        self.scope.pop_this();
    }
}

impl Visit for ReferenceCounter {
    fn visit_expr(&mut self, n: &Expr) {
        if let Expr::Ident(ident) = n {
            self.reference(&ident.sym);
        }
        n.visit_children_with(self);
    }

    fn visit_simple_assign_target(&mut self, n: &SimpleAssignTarget) {
        if let SimpleAssignTarget::Ident(binding) = n {
            self.reference(&binding.id.sym);
        }
        n.visit_children_with(self);
    }

    fn visit_prop(&mut self, n: &Prop) {
        if let Prop::Shorthand(ident) = n {
            self.reference(&ident.sym);
        }
        n.visit_children_with(self);
    }

    /// Type references, `typeof X` queries and the head of `X.Y` qualified names
    fn visit_ts_entity_name(&mut self, n: &TsEntityName) {
        if let TsEntityName::Ident(ident) = n {
            self.reference(&ident.sym);
        }
        n.visit_children_with(self);
    }

    fn visit_named_export(&mut self, n: &NamedExport) {
        // Re-exports do not reference local bindings
        if n.src.is_some() {
            return;
        }

        for specifier in n.specifiers.iter() {
            if let ExportSpecifier::Named(ExportNamedSpecifier {
                orig: ModuleExportName::Ident(ident),
                ..
            }) = specifier
            {
                self.reference(&ident.sym);
            }
        }
    }

    fn visit_function(&mut self, n: &Function) {
        self.with_frame(function_bindings(n), |this| {
            this.with_this(true, |this| n.visit_children_with(this))
        });
    }

    fn visit_arrow_expr(&mut self, n: &ArrowExpr) {
        self.with_frame(arrow_bindings(n), |this| n.visit_children_with(this));
    }

    fn visit_constructor(&mut self, n: &Constructor) {
        self.with_frame(constructor_bindings(n), |this| {
            this.with_this(true, |this| n.visit_children_with(this))
        });
    }

    fn visit_block_stmt(&mut self, n: &BlockStmt) {
        self.with_frame(block_bindings(&n.stmts), |this| n.visit_children_with(this));
    }

    fn visit_for_stmt(&mut self, n: &ForStmt) {
        let head = match n.init {
            Some(VarDeclOrExpr::VarDecl(ref var_decl)) => Some(&**var_decl),
            _ => None,
        };
        self.with_frame(for_head_bindings(head), |this| n.visit_children_with(this));
    }

    fn visit_for_in_stmt(&mut self, n: &ForInStmt) {
        let head = match n.left {
            ForHead::VarDecl(ref var_decl) => Some(&**var_decl),
            _ => None,
        };
        self.with_frame(for_head_bindings(head), |this| n.visit_children_with(this));
    }

    fn visit_for_of_stmt(&mut self, n: &ForOfStmt) {
        let head = match n.left {
            ForHead::VarDecl(ref var_decl) => Some(&**var_decl),
            _ => None,
        };
        self.with_frame(for_head_bindings(head), |this| n.visit_children_with(this));
    }

    fn visit_switch_stmt(&mut self, n: &SwitchStmt) {
        self.with_frame(switch_bindings(n), |this| n.visit_children_with(this));
    }

    fn visit_catch_clause(&mut self, n: &CatchClause) {
        self.with_frame(catch_bindings(n), |this| n.visit_children_with(this));
    }

    fn visit_fn_expr(&mut self, n: &FnExpr) {
        let names = n.ident.iter().map(|ident| ident.sym.clone()).collect();
        self.with_frame(names, |this| n.visit_children_with(this));
    }

    fn visit_class_expr(&mut self, n: &ClassExpr) {
        let names = n.ident.iter().map(|ident| ident.sym.clone()).collect();
        self.with_frame(names, |this| n.visit_children_with(this));
    }

    fn visit_class_prop(&mut self, n: &ClassProp) {
        self.with_this(!n.is_static, |this| n.visit_children_with(this));
    }

    fn visit_private_prop(&mut self, n: &PrivateProp) {
        self.with_this(!n.is_static, |this| n.visit_children_with(this));
    }

    fn visit_static_block(&mut self, n: &StaticBlock) {
        self.with_frame(static_block_bindings(n), |this| {
            this.with_this(false, |this| n.visit_children_with(this))
        });
    }

    fn visit_getter_prop(&mut self, n: &GetterProp) {
        self.with_this(true, |this| n.visit_children_with(this));
    }

    fn visit_setter_prop(&mut self, n: &SetterProp) {
        let mut names = Vec::new();
        collect_pat_names(&n.param, &mut names);
        self.with_frame(names, |this| {
            this.with_this(true, |this| n.visit_children_with(this))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::parser::parse_javascript_module;

    fn count(code: &str) -> ReferenceCounts {
        let module = parse_javascript_module(code).expect("valid module");
        count_references(&module)
    }

    fn refs(counts: &ReferenceCounts, name: &str) -> usize {
        counts
            .imports
            .get(&HbsAtom::from(name))
            .copied()
            .unwrap_or_default()
    }

    #[test]
    fn it_counts_import_references() {
        let counts = count(
            r#"
            import { precompileTemplate } from "@ember/template-compilation";
            import Helper from "./helper";
            export default precompileTemplate("<Helper />", { scope: () => ({ Helper }) });
            export { Helper };
            "#,
        );
        assert_eq!(refs(&counts, "precompileTemplate"), 1);
        assert_eq!(refs(&counts, "Helper"), 2);
    }

    #[test]
    fn it_ignores_shadowed_references() {
        let counts = count(
            r#"
            import { hbs } from "ember-cli-htmlbars";
            function render(hbs) { return hbs`<div />`; }
            const other = (x) => { let hbs = x; return hbs; };
            try {} catch (hbs) { hbs; }
            "#,
        );
        assert_eq!(refs(&counts, "hbs"), 0);
    }

    #[test]
    fn it_collects_free_globals() {
        let counts = count(
            r#"
            import { a } from "a";
            let b = 1;
            console.log(a, b, two);
            "#,
        );
        assert!(counts.free_globals.contains(&HbsAtom::from("console")));
        assert!(counts.free_globals.contains(&HbsAtom::from("two")));
        assert!(!counts.free_globals.contains(&HbsAtom::from("b")));
        assert!(!counts.free_globals.contains(&HbsAtom::from("a")));
    }
}
