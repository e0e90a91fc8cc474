//! The ledger of names shared by a template and its host module.
//!
//! Before compilation starts the compiler needs the list of `locals`, but the
//! jsutils API may still extend it while the compiler runs its plugins.
//! `ScopeLocals` owns both that list and the mapping from template-facing to
//! host-facing names, and is the only place where either changes.
//! Callers only ever get slices or snapshots of the locals.

use fxhash::{FxHashMap, FxHashSet};
use hbsc_core::{is_allowed_global, BindingMode, HbsAtom};
use tracing::trace;

use crate::atoms::THIS;

#[derive(Debug, Clone)]
pub struct ScopeLocals {
    mode: BindingMode,
    /// Only meaningful in implicit mode
    may_use_lexical_this: bool,
    mapping: FxHashMap<HbsAtom, HbsAtom>,
    /// Insertion-ordered, deduplicated. The order defines the compiled scope slots.
    locals: Vec<HbsAtom>,
}

impl ScopeLocals {
    /// Names come from a `scope` declaration or the jsutils API only
    pub fn explicit() -> ScopeLocals {
        ScopeLocals::new(BindingMode::Explicit, false)
    }

    /// Names referenced by the template are captured from the host scope
    pub fn implicit(may_use_lexical_this: bool) -> ScopeLocals {
        ScopeLocals::new(BindingMode::Implicit, may_use_lexical_this)
    }

    fn new(mode: BindingMode, may_use_lexical_this: bool) -> ScopeLocals {
        ScopeLocals {
            mode,
            may_use_lexical_this,
            mapping: Default::default(),
            locals: Vec::new(),
        }
    }

    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    /// Read-only view of the locals, in slot order
    pub fn locals(&self) -> &[HbsAtom] {
        &self.locals
    }

    pub fn has(&self, hbs_name: &str) -> bool {
        self.mapping.contains_key(&HbsAtom::from(hbs_name))
    }

    /// Host-facing name of a local
    pub fn get(&self, hbs_name: &str) -> Option<&HbsAtom> {
        self.mapping.get(&HbsAtom::from(hbs_name))
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    /// `(template-facing, host-facing)` pairs in slot order
    pub fn entries(&self) -> impl Iterator<Item = (&HbsAtom, &HbsAtom)> {
        self.locals
            .iter()
            .map(|hbs_name| (hbs_name, self.mapping.get(hbs_name).unwrap_or(hbs_name)))
    }

    /// Whether any local is known under a different name on the host side
    pub fn needs_remapping(&self) -> bool {
        self.entries().any(|(hbs_name, js_name)| hbs_name != js_name)
    }

    /// Adds a local.
    ///
    /// A new name is appended to the locals and maps to `js_name`, or to itself.
    /// For an existing name, an explicit `js_name` replaces the mapping,
    /// while `None` keeps whatever mapping was established before.
    pub fn add(&mut self, hbs_name: HbsAtom, js_name: Option<HbsAtom>) {
        if let Some(existing) = self.mapping.get_mut(&hbs_name) {
            if let Some(js_name) = js_name {
                *existing = js_name;
            }
            return;
        }

        let js_name = js_name.unwrap_or_else(|| hbs_name.clone());
        self.mapping.insert(hbs_name.clone(), js_name);
        self.locals.push(hbs_name);
    }

    /// Reconciles the ledger with the free names a template actually uses.
    ///
    /// `seen` holds those names in discovery order.
    /// Implicit mode captures every seen name which resolves on the host side,
    /// explicit mode drops every declared name which was not seen.
    pub fn reconcile(&mut self, seen: &[HbsAtom], has_host_binding: impl Fn(&str) -> bool) {
        match self.mode {
            BindingMode::Implicit => {
                for name in seen.iter() {
                    let captured = if *name == *THIS {
                        self.may_use_lexical_this
                    } else {
                        let js_name = self.mapping.get(name).unwrap_or(name);
                        is_allowed_global(js_name) || has_host_binding(js_name)
                    };

                    if captured {
                        self.add(name.clone(), None);
                    }
                }
            }

            BindingMode::Explicit => {
                let seen: FxHashSet<&HbsAtom> = seen.iter().collect();
                let mapping = &mut self.mapping;
                self.locals.retain(|name| {
                    let keep = seen.contains(name);
                    if !keep {
                        mapping.remove(name);
                    }
                    keep
                });
            }
        }

        trace!(mode = ?self.mode, locals = ?self.locals, "Reconciled scope locals");
    }
}
