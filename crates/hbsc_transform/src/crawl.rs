use std::{cell::RefCell, rc::Rc};

use fxhash::FxHashSet;
use hbsc_core::{
    template::{visit::*, ElementNode, PathExpression, Template, TemplateScope},
    AstPlugin, HbsAtom, JsUtils, PluginError,
};
use tracing::trace;

use crate::scope_locals::ScopeLocals;

pub const SCOPE_CRAWLER_NAME: &str = "scope-locals-crawl";

/// The last plugin of every compilation.
///
/// Collects the free names of the template and reconciles the site's
/// [`ScopeLocals`] with them once the whole template has been seen.
pub struct ScopeCrawler {
    locals: Rc<RefCell<ScopeLocals>>,
}

impl ScopeCrawler {
    pub fn new(locals: Rc<RefCell<ScopeLocals>>) -> ScopeCrawler {
        ScopeCrawler { locals }
    }
}

impl AstPlugin for ScopeCrawler {
    fn name(&self) -> &str {
        SCOPE_CRAWLER_NAME
    }

    fn transform(
        &mut self,
        template: &mut Template,
        jsutils: &mut dyn JsUtils,
    ) -> Result<(), PluginError> {
        let mut seen = SeenNames::default();
        seen.visit_mut_template(template)?;

        trace!(seen = ?seen.names, "Crawled template");
        self.locals
            .borrow_mut()
            .reconcile(&seen.names, |name| jsutils.has_host_binding(name));
        Ok(())
    }
}

/// Free names in discovery order
#[derive(Default)]
struct SeenNames {
    names: Vec<HbsAtom>,
    dedupe: FxHashSet<HbsAtom>,
}

impl SeenNames {
    fn record(&mut self, name: &str, scope: &TemplateScope<'_>) {
        if scope.has_binding(name) {
            return;
        }

        let name = HbsAtom::from(name);
        if self.dedupe.insert(name.clone()) {
            self.names.push(name);
        }
    }
}

impl VisitMut for SeenNames {
    fn visit_mut_path(&mut self, n: &mut PathExpression, scope: &TemplateScope<'_>) -> VisitResult {
        if let Some(name) = n.head_name() {
            self.record(name, scope);
        }
        Ok(())
    }

    fn visit_mut_element(&mut self, n: &mut ElementNode, scope: &TemplateScope<'_>) -> VisitResult {
        // Plain HTML tags are recorded too, they only get captured when the host binds them
        if let Some(head) = n.tag_head() {
            let head = head.to_owned();
            self.record(&head, scope);
        }
        walk_element(self, n, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbsc_core::{hbs_atom, JsExpression, JsUtilsError};

    /// Host scope made of a fixed list of names
    struct HostNames(Vec<&'static str>);

    impl JsUtils for HostNames {
        fn bind_expression(
            &mut self,
            _expression: JsExpression<'_>,
            _target: &TemplateScope<'_>,
            _name_hint: Option<&str>,
        ) -> Result<HbsAtom, JsUtilsError> {
            unreachable!()
        }

        fn bind_import(
            &mut self,
            _module_specifier: &str,
            _exported_name: &str,
            _target: &TemplateScope<'_>,
            _name_hint: Option<&str>,
        ) -> HbsAtom {
            unreachable!()
        }

        fn import_for_side_effect(&mut self, _module_specifier: &str) {}

        fn emit_expression(&mut self, _expression: JsExpression<'_>) -> Result<(), JsUtilsError> {
            unreachable!()
        }

        fn has_host_binding(&self, name: &str) -> bool {
            self.0.contains(&name)
        }

        fn locals(&self) -> Vec<HbsAtom> {
            Vec::new()
        }
    }

    fn crawl(template: &str, locals: ScopeLocals, host: Vec<&'static str>) -> Vec<HbsAtom> {
        let mut template = hbsc_syntax::parse_template(template).expect("valid template");
        let locals = Rc::new(RefCell::new(locals));

        let mut crawler = ScopeCrawler::new(locals.clone());
        crawler
            .transform(&mut template, &mut HostNames(host))
            .expect("crawl succeeds");

        let result = locals.borrow().locals().to_vec();
        result
    }

    #[test]
    fn it_captures_host_bindings_in_implicit_mode() {
        let locals = crawl(
            "<Button @onClick={{handler}} />{{format date}}{{unknown}}{{Math.max 1 2}}",
            ScopeLocals::implicit(false),
            vec!["Button", "handler", "format"],
        );
        assert_eq!(
            locals,
            vec![
                hbs_atom!("Button"),
                hbs_atom!("handler"),
                hbs_atom!("format"),
                hbs_atom!("Math")
            ]
        );
    }

    #[test]
    fn it_captures_this_only_when_allowed() {
        let template = "{{this.name}}";
        assert!(crawl(template, ScopeLocals::implicit(false), vec![]).is_empty());
        assert_eq!(
            crawl(template, ScopeLocals::implicit(true), vec![]),
            vec![hbs_atom!("this")]
        );
    }

    #[test]
    fn it_respects_block_param_shadowing() {
        // The element's own attributes see the outer `item`
        let locals = crawl(
            "<List @items={{item}} as |item|>{{item.name}}</List>{{#each rows as |row|}}<row />{{/each}}",
            ScopeLocals::implicit(false),
            vec!["List", "item", "row", "rows"],
        );
        assert_eq!(
            locals,
            vec![hbs_atom!("List"), hbs_atom!("item"), hbs_atom!("rows")]
        );
    }

    #[test]
    fn it_prunes_unused_explicit_scope() {
        let mut explicit = ScopeLocals::explicit();
        explicit.add(hbs_atom!("foo"), None);
        explicit.add(hbs_atom!("bar"), None);
        explicit.add(hbs_atom!("baz"), None);

        let locals = crawl("{{foo}}{{bar}}{{other}}", explicit, vec!["other"]);
        assert_eq!(locals, vec![hbs_atom!("foo"), hbs_atom!("bar")]);
    }

    #[test]
    fn it_never_captures_in_explicit_mode() {
        let locals = crawl("{{helper}}<Other />", ScopeLocals::explicit(), vec!["helper", "Other"]);
        assert!(locals.is_empty());
    }
}
