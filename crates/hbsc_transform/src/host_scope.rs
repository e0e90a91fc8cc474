//! Lexical scope tracking for the host module.
//!
//! Visitors push a frame for every construct introducing bindings and pop it on
//! exit, which gives the set of names visible at the current position.
//! Declarations are collected when a frame is entered, so hoisted functions,
//! `var`s and later `let`s are already visible at the start of their scope.

use fxhash::FxHashMap;
use hbsc_core::HbsAtom;
use swc_core::ecma::{
    ast::*,
    visit::{Visit, VisitWith},
};

use crate::atoms::{DEFAULT, NAMESPACE};

/// Where a binding comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Local,
    /// A value import. `imported` is `default` or `*` for default and namespace imports.
    Import { source: HbsAtom, imported: HbsAtom },
}

#[derive(Debug, Default)]
struct Frame {
    bindings: FxHashMap<HbsAtom, BindingKind>,
}

#[derive(Debug)]
pub struct HostScope {
    /// The first frame is the module one
    frames: Vec<Frame>,
    /// Whether `this` may be captured as a value at the current position
    this_stack: Vec<bool>,
}

impl Default for HostScope {
    fn default() -> Self {
        HostScope {
            frames: vec![Frame::default()],
            this_stack: vec![true],
        }
    }
}

impl HostScope {
    /// Declares everything bound at the top level of `module`
    pub fn declare_module(&mut self, module: &Module) {
        let mut names = Vec::new();

        for item in module.body.iter() {
            match item {
                ModuleItem::ModuleDecl(ModuleDecl::Import(import_decl)) => {
                    self.declare_import(import_decl)
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export_decl)) => {
                    collect_decl_names(&export_decl.decl, &mut names)
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export_default)) => {
                    match export_default.decl {
                        DefaultDecl::Class(ClassExpr {
                            ident: Some(ref ident),
                            ..
                        })
                        | DefaultDecl::Fn(FnExpr {
                            ident: Some(ref ident),
                            ..
                        }) => names.push(ident.sym.clone()),
                        _ => {}
                    }
                }
                ModuleItem::Stmt(Stmt::Decl(decl)) => collect_decl_names(decl, &mut names),
                _ => {}
            }
        }

        module.visit_with(&mut VarCollector { names: &mut names });

        for name in names {
            self.declare(name, BindingKind::Local);
        }
    }

    fn declare_import(&mut self, import_decl: &ImportDecl) {
        for specifier in import_decl.specifiers.iter() {
            let (local, imported, is_type_only) = match specifier {
                ImportSpecifier::Named(named) => {
                    let imported = match named.imported {
                        Some(ModuleExportName::Ident(ref ident)) => ident.sym.clone(),
                        Some(ModuleExportName::Str(ref s)) => s.value.clone(),
                        None => named.local.sym.clone(),
                    };
                    (&named.local, imported, named.is_type_only)
                }
                ImportSpecifier::Default(default) => (&default.local, DEFAULT.clone(), false),
                ImportSpecifier::Namespace(namespace) => {
                    (&namespace.local, NAMESPACE.clone(), false)
                }
            };

            // Type-only imports still occupy the name
            let kind = if import_decl.type_only || is_type_only {
                BindingKind::Local
            } else {
                BindingKind::Import {
                    source: import_decl.src.value.clone(),
                    imported,
                }
            };
            self.declare(local.sym.clone(), kind);
        }
    }

    /// Adds a binding to the module frame
    pub fn declare_at_module(&mut self, name: HbsAtom, kind: BindingKind) {
        if let Some(module_frame) = self.frames.first_mut() {
            module_frame.bindings.insert(name, kind);
        }
    }

    /// Adds a binding to the innermost frame
    pub fn declare(&mut self, name: HbsAtom, kind: BindingKind) {
        if let Some(frame) = self.frames.last_mut() {
            frame.bindings.insert(name, kind);
        }
    }

    pub fn push_frame(&mut self, names: Vec<HbsAtom>) {
        let mut frame = Frame::default();
        for name in names {
            frame.bindings.insert(name, BindingKind::Local);
        }
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) {
        // The module frame stays
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn push_this(&mut self, may_use_lexical_this: bool) {
        self.this_stack.push(may_use_lexical_this);
    }

    pub fn pop_this(&mut self) {
        if self.this_stack.len() > 1 {
            self.this_stack.pop();
        }
    }

    /// `false` inside class static blocks, where `this` is the class itself
    pub fn may_use_lexical_this(&self) -> bool {
        self.this_stack.last().copied().unwrap_or(true)
    }

    /// The innermost binding of `name`, and whether it sits in the module frame
    pub fn resolve(&self, name: &str) -> Option<(&BindingKind, bool)> {
        let name = HbsAtom::from(name);
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, frame)| frame.bindings.get(&name).map(|kind| (kind, depth == 0)))
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Whether `name` resolves to the module-level import of `imported` from `source`
    pub fn resolves_to_import(&self, name: &str, source: &str, imported: &str) -> bool {
        matches!(
            self.resolve(name),
            Some((BindingKind::Import { source: s, imported: i }, true)) if &**s == source && &**i == imported
        )
    }

    /// The import `name` resolves to, if it is an unshadowed module-level import
    pub fn resolve_import(&self, name: &str) -> Option<(&HbsAtom, &HbsAtom)> {
        match self.resolve(name) {
            Some((BindingKind::Import { source, imported }, true)) => Some((source, imported)),
            _ => None,
        }
    }
}

/// Names bound by a function's params and `var`s
pub fn function_bindings(function: &Function) -> Vec<HbsAtom> {
    let mut names = Vec::new();
    for param in function.params.iter() {
        collect_pat_names(&param.pat, &mut names);
    }
    if let Some(ref body) = function.body {
        body.visit_with(&mut VarCollector { names: &mut names });
    }
    names
}

pub fn arrow_bindings(arrow: &ArrowExpr) -> Vec<HbsAtom> {
    let mut names = Vec::new();
    for param in arrow.params.iter() {
        collect_pat_names(param, &mut names);
    }
    if let BlockStmtOrExpr::BlockStmt(ref body) = *arrow.body {
        body.visit_with(&mut VarCollector { names: &mut names });
    }
    names
}

pub fn constructor_bindings(constructor: &Constructor) -> Vec<HbsAtom> {
    let mut names = Vec::new();
    for param in constructor.params.iter() {
        match param {
            ParamOrTsParamProp::Param(param) => collect_pat_names(&param.pat, &mut names),
            ParamOrTsParamProp::TsParamProp(prop) => match prop.param {
                TsParamPropParam::Ident(ref ident) => names.push(ident.id.sym.clone()),
                TsParamPropParam::Assign(ref assign) => collect_pat_names(&assign.left, &mut names),
            },
        }
    }
    if let Some(ref body) = constructor.body {
        body.visit_with(&mut VarCollector { names: &mut names });
    }
    names
}

/// Names declared by `let`, `const`, `class` and `function` directly in `stmts`
pub fn block_bindings(stmts: &[Stmt]) -> Vec<HbsAtom> {
    let mut names = Vec::new();
    for stmt in stmts.iter() {
        if let Stmt::Decl(decl) = stmt {
            match decl {
                // `var`s are hoisted to the function
                Decl::Var(var_decl) if var_decl.kind == VarDeclKind::Var => {}
                decl => collect_decl_names(decl, &mut names),
            }
        }
    }
    names
}

pub fn switch_bindings(switch: &SwitchStmt) -> Vec<HbsAtom> {
    let mut names = Vec::new();
    for case in switch.cases.iter() {
        names.extend(block_bindings(&case.cons));
    }
    names
}

/// Lexical bindings of a `for` head, e.g. `for (let i = 0; ...)`
pub fn for_head_bindings(var_decl: Option<&VarDecl>) -> Vec<HbsAtom> {
    let mut names = Vec::new();
    if let Some(var_decl) = var_decl {
        if var_decl.kind != VarDeclKind::Var {
            for declarator in var_decl.decls.iter() {
                collect_pat_names(&declarator.name, &mut names);
            }
        }
    }
    names
}

pub fn catch_bindings(catch: &CatchClause) -> Vec<HbsAtom> {
    let mut names = Vec::new();
    if let Some(ref param) = catch.param {
        collect_pat_names(param, &mut names);
    }
    names
}

pub fn static_block_bindings(static_block: &StaticBlock) -> Vec<HbsAtom> {
    let mut names = Vec::new();
    static_block
        .body
        .visit_with(&mut VarCollector { names: &mut names });
    names
}

fn collect_decl_names(decl: &Decl, out: &mut Vec<HbsAtom>) {
    match decl {
        Decl::Class(class_decl) => out.push(class_decl.ident.sym.clone()),
        Decl::Fn(fn_decl) => out.push(fn_decl.ident.sym.clone()),
        Decl::Var(var_decl) => {
            for declarator in var_decl.decls.iter() {
                collect_pat_names(&declarator.name, out);
            }
        }
        Decl::Using(using_decl) => {
            for declarator in using_decl.decls.iter() {
                collect_pat_names(&declarator.name, out);
            }
        }
        Decl::TsEnum(ts_enum) => out.push(ts_enum.id.sym.clone()),
        Decl::TsInterface(_) | Decl::TsTypeAlias(_) | Decl::TsModule(_) => {}
    }
}

pub fn collect_pat_names(pat: &Pat, out: &mut Vec<HbsAtom>) {
    match pat {
        Pat::Ident(binding) => out.push(binding.id.sym.clone()),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                collect_pat_names(elem, out);
            }
        }
        Pat::Rest(rest) => collect_pat_names(&rest.arg, out),
        Pat::Object(object) => {
            for prop in object.props.iter() {
                match prop {
                    ObjectPatProp::KeyValue(kv) => collect_pat_names(&kv.value, out),
                    ObjectPatProp::Assign(assign) => out.push(assign.key.id.sym.clone()),
                    ObjectPatProp::Rest(rest) => collect_pat_names(&rest.arg, out),
                }
            }
        }
        Pat::Assign(assign) => collect_pat_names(&assign.left, out),
        Pat::Invalid(_) | Pat::Expr(_) => {}
    }
}

/// Collects `var` names of a function body without entering nested functions
struct VarCollector<'n> {
    names: &'n mut Vec<HbsAtom>,
}

impl Visit for VarCollector<'_> {
    fn visit_var_decl(&mut self, n: &VarDecl) {
        if n.kind == VarDeclKind::Var {
            for declarator in n.decls.iter() {
                collect_pat_names(&declarator.name, self.names);
            }
        }
        n.visit_children_with(self);
    }

    fn visit_function(&mut self, _n: &Function) {}

    fn visit_arrow_expr(&mut self, _n: &ArrowExpr) {}

    fn visit_class(&mut self, _n: &Class) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::parser::parse_javascript_module;

    fn module_scope(code: &str) -> HostScope {
        let module = parse_javascript_module(code).expect("valid module");
        let mut scope = HostScope::default();
        scope.declare_module(&module);
        scope
    }

    #[test]
    fn it_declares_module_bindings() {
        let scope = module_scope(
            r#"
            import { precompileTemplate as pt } from "@ember/template-compilation";
            import type { Foo } from "./types";
            import * as ns from "ns";
            export const a = 1;
            export default class Component {}
            function hoisted() {}
            if (true) { var fromBlock = 1; let notHoisted = 2; }
            function inner() { var notHere = 1; }
            "#,
        );

        assert!(scope.resolves_to_import("pt", "@ember/template-compilation", "precompileTemplate"));
        assert!(scope.resolves_to_import("ns", "ns", "*"));
        assert!(!scope.resolves_to_import("Foo", "./types", "Foo"));
        assert!(scope.has_binding("Foo"));
        for name in ["a", "Component", "hoisted", "fromBlock", "inner"] {
            assert!(scope.has_binding(name), "{name} should be bound");
        }
        assert!(!scope.has_binding("notHoisted"));
        assert!(!scope.has_binding("notHere"));
    }

    #[test]
    fn it_shadows_with_inner_frames() {
        let mut scope = module_scope(r#"import { hbs } from "ember-cli-htmlbars";"#);
        assert!(scope.resolve_import("hbs").is_some());

        scope.push_frame(vec![HbsAtom::from("hbs")]);
        assert!(scope.resolve_import("hbs").is_none());
        assert!(scope.has_binding("hbs"));

        scope.pop_frame();
        assert!(scope.resolve_import("hbs").is_some());

        // The module frame is never popped
        scope.pop_frame();
        assert!(scope.has_binding("hbs"));
    }

    #[test]
    fn it_tracks_lexical_this() {
        let mut scope = HostScope::default();
        assert!(scope.may_use_lexical_this());
        scope.push_this(false);
        assert!(!scope.may_use_lexical_this());
        scope.push_this(true);
        assert!(scope.may_use_lexical_this());
        scope.pop_this();
        scope.pop_this();
        assert!(scope.may_use_lexical_this());
    }

    #[test]
    fn it_collects_pattern_names() {
        let module =
            parse_javascript_module("function f({ a, b: [c, ...d], e = 1 }, ...rest) { var v; }")
                .expect("valid module");
        let ModuleItem::Stmt(Stmt::Decl(Decl::Fn(ref fn_decl))) = module.body[0] else {
            panic!("expected a function declaration");
        };

        let names: Vec<String> = function_bindings(&fn_decl.function)
            .iter()
            .map(|it| it.to_string())
            .collect();
        assert_eq!(names, vec!["a", "c", "d", "e", "rest", "v"]);
    }
}
