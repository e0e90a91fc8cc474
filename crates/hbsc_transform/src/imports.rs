//! Finding, adding and removing import declarations of the host module.
//!
//! Changes are recorded while the module is traversed and applied to the
//! module body in one go when the unit finishes.

use fxhash::{FxHashMap, FxHashSet};
use hbsc_core::HbsAtom;
use swc_core::{
    common::DUMMY_SP,
    ecma::ast::*,
};
use tracing::debug;

use crate::{
    atoms::{DEFAULT, NAMESPACE},
    host_scope::{BindingKind, HostScope},
    name::{identifier_like, is_identifier, unused_name_like},
    references::ReferenceCounts,
};

#[derive(Debug, Clone)]
struct KnownImport {
    source: HbsAtom,
    imported: HbsAtom,
    local: HbsAtom,
}

#[derive(Debug, Clone)]
enum NewImport {
    Specifier(KnownImport),
    /// `import "source";`
    SideEffect(HbsAtom),
}

#[derive(Debug, Default)]
pub struct ImportUtil {
    /// Value imports of the unit, pre-existing and added
    known: Vec<KnownImport>,
    /// In creation order
    added: Vec<NewImport>,
    /// Every module specifier imported by the unit
    sources: FxHashSet<HbsAtom>,
    /// Module specifiers which must stay imported even without specifiers
    side_effects: FxHashSet<HbsAtom>,
    /// `(source, imported)` pairs to remove when the unit finishes
    removed: Vec<(HbsAtom, HbsAtom)>,
    references: FxHashMap<HbsAtom, usize>,
    /// Imports which lost a reference
    touched: FxHashSet<HbsAtom>,
    free_globals: FxHashSet<HbsAtom>,
}

impl ImportUtil {
    pub fn new(module: &Module, counts: ReferenceCounts) -> ImportUtil {
        let mut known = Vec::new();
        let mut sources = FxHashSet::default();

        for import_decl in import_decls(&module.body) {
            sources.insert(import_decl.src.value.clone());
            if import_decl.type_only {
                continue;
            }

            for specifier in import_decl.specifiers.iter() {
                if is_type_only(specifier) {
                    continue;
                }
                let (local, imported) = specifier_names(specifier);
                known.push(KnownImport {
                    source: import_decl.src.value.clone(),
                    imported,
                    local: local.clone(),
                });
            }
        }

        ImportUtil {
            known,
            sources,
            references: counts.imports,
            free_globals: counts.free_globals,
            ..Default::default()
        }
    }

    /// Whether `name` is referenced as a global somewhere in the unit
    pub fn is_free_global(&self, name: &str) -> bool {
        self.free_globals.contains(&HbsAtom::from(name))
    }

    /// Finds or creates an import of `imported` from `source` usable at the current position of `scope`.
    /// Returns the local name.
    pub fn import(
        &mut self,
        scope: &mut HostScope,
        source: &str,
        imported: &str,
        name_hint: Option<&str>,
    ) -> HbsAtom {
        let existing = self.known.iter().find(|known| {
            &*known.source == source
                && &*known.imported == imported
                && scope.resolves_to_import(&known.local, source, imported)
        });
        if let Some(existing) = existing {
            let local = existing.local.clone();
            self.removed
                .retain(|(s, i)| !(&**s == source && &**i == imported));
            return local;
        }

        let desired = identifier_like(desired_name(source, imported, name_hint));
        let free_globals = &self.free_globals;
        let local = unused_name_like(&desired, |candidate| {
            scope.has_binding(candidate) || free_globals.contains(&HbsAtom::from(candidate))
        });

        let known = KnownImport {
            source: HbsAtom::from(source),
            imported: HbsAtom::from(imported),
            local: local.clone(),
        };
        scope.declare_at_module(
            local.clone(),
            BindingKind::Import {
                source: known.source.clone(),
                imported: known.imported.clone(),
            },
        );
        debug!(source, imported, local = &*local, "Adding import");

        self.sources.insert(known.source.clone());
        self.known.push(known.clone());
        self.added.push(NewImport::Specifier(known));
        local
    }

    /// Adds `import "source";` unless the unit already imports `source`
    pub fn import_for_side_effect(&mut self, source: &str) {
        let source = HbsAtom::from(source);
        self.side_effects.insert(source.clone());
        if self.sources.contains(&source) {
            return;
        }

        debug!(source = &*source, "Adding side-effect import");
        self.sources.insert(source.clone());
        self.added.push(NewImport::SideEffect(source));
    }

    /// Records a reference written into the output
    pub fn add_reference(&mut self, local: &HbsAtom) {
        *self.references.entry(local.clone()).or_default() += 1;
    }

    /// Records that a reference was elided from the output
    pub fn remove_reference(&mut self, local: &HbsAtom) {
        let count = self.references.entry(local.clone()).or_default();
        *count = count.saturating_sub(1);
        self.touched.insert(local.clone());
    }

    /// Records a reference to `local` written at the current position of `scope`.
    /// Only counted when `local` resolves to the module-level import there.
    pub fn reference_in(&mut self, scope: &HostScope, local: &HbsAtom) {
        if scope.resolve_import(local).is_some() {
            self.add_reference(local);
        }
    }

    /// Records that a reference to `local` at the current position of `scope` was elided
    pub fn release_in(&mut self, scope: &HostScope, local: &HbsAtom) {
        if scope.resolve_import(local).is_some() {
            self.remove_reference(local);
        }
    }

    pub fn references(&self, local: &str) -> usize {
        self.references
            .get(&HbsAtom::from(local))
            .copied()
            .unwrap_or_default()
    }

    /// Removes every specifier importing `imported` from `source` when the unit finishes
    pub fn remove_import(&mut self, source: &str, imported: &str) {
        self.removed
            .push((HbsAtom::from(source), HbsAtom::from(imported)));
    }

    /// Writes the recorded changes into `module`.
    /// Added imports and then `injected` statements go right after the leading imports.
    pub fn apply(self, module: &mut Module, injected: Vec<Stmt>) {
        let ImportUtil {
            added,
            removed,
            side_effects,
            references,
            touched,
            ..
        } = self;

        // Imports which lost their last reference
        let unreferenced: FxHashSet<&HbsAtom> = touched
            .iter()
            .filter(|local| references.get(*local).copied().unwrap_or_default() == 0)
            .collect();

        let mut emptied: Vec<HbsAtom> = Vec::new();
        module.body.retain_mut(|item| {
            let ModuleItem::ModuleDecl(ModuleDecl::Import(import_decl)) = item else {
                return true;
            };
            if import_decl.specifiers.is_empty() || import_decl.type_only {
                return true;
            }

            let source = import_decl.src.value.clone();
            import_decl.specifiers.retain(|specifier| {
                if is_type_only(specifier) {
                    return true;
                }
                let (local, imported) = specifier_names(specifier);
                let remove = unreferenced.contains(local)
                    || removed.iter().any(|(s, i)| *s == source && *i == imported);
                if remove {
                    debug!(source = &*source, local = &**local, "Removing import");
                }
                !remove
            });

            if import_decl.specifiers.is_empty() {
                emptied.push(source);
                return false;
            }
            true
        });

        // A requested side effect outlives the specifiers of its declaration
        let mut new_decls: Vec<ImportDecl> = Vec::new();
        for source in emptied {
            if !side_effects.contains(&source)
                || import_decls(&module.body).any(|import_decl| import_decl.src.value == source)
                || new_decls.iter().any(|import_decl| import_decl.src.value == source)
            {
                continue;
            }
            debug!(source = &*source, "Keeping side-effect import");
            new_decls.push(import_decl(source, vec![]));
        }

        for new_import in added {
            let known = match new_import {
                NewImport::SideEffect(source) => {
                    new_decls.push(import_decl(source, vec![]));
                    continue;
                }
                NewImport::Specifier(known) => known,
            };

            let specifier = make_specifier(&known);
            let joinable = module
                .body
                .iter_mut()
                .filter_map(|item| match item {
                    ModuleItem::ModuleDecl(ModuleDecl::Import(import_decl)) => Some(import_decl),
                    _ => None,
                })
                .chain(new_decls.iter_mut())
                .find(|import_decl| can_join(import_decl, &known));

            if let Some(import_decl) = joinable {
                if matches!(specifier, ImportSpecifier::Default(_)) {
                    import_decl.specifiers.insert(0, specifier);
                } else {
                    import_decl.specifiers.push(specifier);
                }
                continue;
            }

            new_decls.push(import_decl(known.source, vec![specifier]));
        }

        let insert_at = module
            .body
            .iter()
            .take_while(|item| matches!(item, ModuleItem::ModuleDecl(ModuleDecl::Import(_))))
            .count();

        let new_items = new_decls
            .into_iter()
            .map(|import_decl| ModuleItem::ModuleDecl(ModuleDecl::Import(import_decl)))
            .chain(injected.into_iter().map(ModuleItem::Stmt));
        module.body.splice(insert_at..insert_at, new_items);
    }
}

fn import_decls(body: &[ModuleItem]) -> impl Iterator<Item = &ImportDecl> {
    body.iter().filter_map(|item| match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(import_decl)) => Some(import_decl),
        _ => None,
    })
}

fn desired_name<'n>(source: &'n str, imported: &'n str, name_hint: Option<&'n str>) -> &'n str {
    if let Some(hint) = name_hint {
        return hint;
    }
    if imported == &**DEFAULT || imported == &**NAMESPACE {
        return source.rsplit('/').next().unwrap_or(source);
    }
    imported
}

/// `(local, imported)` of a specifier
fn specifier_names(specifier: &ImportSpecifier) -> (&HbsAtom, HbsAtom) {
    match specifier {
        ImportSpecifier::Named(named) => {
            let imported = match named.imported {
                Some(ModuleExportName::Ident(ref ident)) => ident.sym.clone(),
                Some(ModuleExportName::Str(ref s)) => s.value.clone(),
                None => named.local.sym.clone(),
            };
            (&named.local.sym, imported)
        }
        ImportSpecifier::Default(default) => (&default.local.sym, DEFAULT.clone()),
        ImportSpecifier::Namespace(namespace) => (&namespace.local.sym, NAMESPACE.clone()),
    }
}

fn is_type_only(specifier: &ImportSpecifier) -> bool {
    matches!(specifier, ImportSpecifier::Named(named) if named.is_type_only)
}

fn can_join(import_decl: &ImportDecl, known: &KnownImport) -> bool {
    if import_decl.type_only || import_decl.src.value != known.source || known.imported == *NAMESPACE
    {
        return false;
    }

    let has_namespace = import_decl
        .specifiers
        .iter()
        .any(|specifier| matches!(specifier, ImportSpecifier::Namespace(_)));
    let has_default = import_decl
        .specifiers
        .iter()
        .any(|specifier| matches!(specifier, ImportSpecifier::Default(_)));

    !has_namespace && !(known.imported == *DEFAULT && has_default)
}

fn make_specifier(known: &KnownImport) -> ImportSpecifier {
    let local = Ident::new_no_ctxt(known.local.clone(), DUMMY_SP);

    if known.imported == *DEFAULT {
        return ImportSpecifier::Default(ImportDefaultSpecifier {
            span: DUMMY_SP,
            local,
        });
    }
    if known.imported == *NAMESPACE {
        return ImportSpecifier::Namespace(ImportStarAsSpecifier {
            span: DUMMY_SP,
            local,
        });
    }

    let imported = if known.imported == known.local {
        None
    } else if is_identifier(&known.imported) {
        Some(ModuleExportName::Ident(Ident::new_no_ctxt(
            known.imported.clone(),
            DUMMY_SP,
        )))
    } else {
        Some(ModuleExportName::Str(Str {
            span: DUMMY_SP,
            value: known.imported.clone(),
            raw: None,
        }))
    };

    ImportSpecifier::Named(ImportNamedSpecifier {
        span: DUMMY_SP,
        local,
        imported,
        is_type_only: false,
    })
}

fn import_decl(source: HbsAtom, specifiers: Vec<ImportSpecifier>) -> ImportDecl {
    ImportDecl {
        span: DUMMY_SP,
        specifiers,
        src: Box::new(Str {
            span: DUMMY_SP,
            value: source,
            raw: None,
        }),
        type_only: false,
        with: None,
        phase: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        references::count_references,
        test_utils::{normalized, parser::parse_javascript_module, to_str},
    };

    fn setup(code: &str) -> (Module, HostScope, ImportUtil) {
        let module = parse_javascript_module(code).expect("valid module");
        let mut scope = HostScope::default();
        scope.declare_module(&module);
        let imports = ImportUtil::new(&module, count_references(&module));
        (module, scope, imports)
    }

    #[test]
    fn it_reuses_existing_imports() {
        let (mut module, mut scope, mut imports) =
            setup(r#"import { hello as hi } from "greetings"; hi();"#);

        let local = imports.import(&mut scope, "greetings", "hello", None);
        assert_eq!(&*local, "hi");

        imports.apply(&mut module, vec![]);
        assert_eq!(to_str(&module), normalized(r#"import { hello as hi } from "greetings"; hi();"#));
    }

    #[test]
    fn it_avoids_taken_names() {
        let (mut module, mut scope, mut imports) = setup(
            r#"
            import two from "elsewhere";
            console.log(two0);
            "#,
        );

        let local = imports.import(&mut scope, "my-library", "default", Some("two"));
        assert_eq!(&*local, "two1");

        // Name derived from the module path
        let derived = imports.import(&mut scope, "@ember/component/template-only", "default", None);
        assert_eq!(&*derived, "templateOnly");

        imports.apply(&mut module, vec![]);
        assert_eq!(
            to_str(&module),
            normalized(
                r#"
                import two from "elsewhere";
                import two1 from "my-library";
                import templateOnly from "@ember/component/template-only";
                console.log(two0);
                "#
            )
        );
    }

    #[test]
    fn it_joins_compatible_declarations() {
        let (mut module, mut scope, mut imports) = setup(
            r#"
            import { a } from "lib";
            import * as ns from "other";
            "#,
        );

        imports.import(&mut scope, "lib", "b", None);
        imports.import(&mut scope, "lib", "default", Some("lib"));
        imports.import(&mut scope, "other", "c", None);
        imports.apply(&mut module, vec![]);

        assert_eq!(
            to_str(&module),
            normalized(
                r#"
                import lib, { a, b } from "lib";
                import * as ns from "other";
                import { c } from "other";
                "#
            )
        );
    }

    #[test]
    fn it_prunes_touched_unreferenced_imports() {
        let (mut module, _, mut imports) = setup(
            r#"
            import { hbs, other } from "ember-cli-htmlbars";
            import { used } from "lib";
            hbs`x`;
            used(); used();
            "#,
        );

        imports.remove_reference(&HbsAtom::from("hbs"));
        imports.remove_reference(&HbsAtom::from("used"));
        assert_eq!(imports.references("used"), 1);
        imports.apply(&mut module, vec![]);

        assert_eq!(
            to_str(&module),
            normalized(
                r#"
                import { other } from "ember-cli-htmlbars";
                import { used } from "lib";
                hbs`x`;
                used(); used();
                "#
            )
        );
    }

    #[test]
    fn it_removes_imports_and_empty_declarations() {
        let (mut module, _, mut imports) = setup(
            r#"
            import { precompileTemplate } from "@ember/template-compilation";
            import "side-effect";
            "#,
        );

        imports.remove_import("@ember/template-compilation", "precompileTemplate");
        imports.apply(&mut module, vec![]);
        assert_eq!(to_str(&module), normalized(r#"import "side-effect";"#));
    }

    #[test]
    fn it_keeps_requested_side_effect_imports() {
        let (mut module, _, mut imports) = setup(
            r#"
            import { foo } from "./helpers";
            import { bar } from "./other";
            foo;
            "#,
        );

        imports.import_for_side_effect("./helpers");
        imports.remove_reference(&HbsAtom::from("foo"));
        imports.remove_import("./other", "bar");
        imports.apply(&mut module, vec![]);

        assert_eq!(to_str(&module), normalized(r#"import "./helpers"; foo;"#));
    }

    #[test]
    fn it_places_new_code_after_leading_imports() {
        let (mut module, mut scope, mut imports) = setup(
            r#"
            import { a } from "a";
            a();
            import { b } from "b";
            "#,
        );

        imports.import_for_side_effect("polyfill");
        imports.import_for_side_effect("a");
        imports.import(&mut scope, "c", "c", None);

        let injected = Stmt::Expr(ExprStmt {
            span: DUMMY_SP,
            expr: Box::new(Expr::Ident(Ident::new_no_ctxt("x".into(), DUMMY_SP))),
        });
        imports.apply(&mut module, vec![injected]);

        assert_eq!(
            to_str(&module),
            normalized(
                r#"
                import { a } from "a";
                import "polyfill";
                import { c } from "c";
                x;
                a();
                import { b } from "b";
                "#
            )
        );
    }
}
