use crate::HbsAtom;

/// Chain of block params visible at some point of the template.
///
/// Each block or element introducing `as |...|` params pushes a new link for
/// its body/children only, which makes shadowing structural: an element's own
/// attributes are evaluated in the scope of its parent.
#[derive(Debug, Clone, Copy)]
pub struct TemplateScope<'a> {
    names: &'a [HbsAtom],
    parent: Option<&'a TemplateScope<'a>>,
}

impl<'a> TemplateScope<'a> {
    /// Scope of a template root
    pub fn root(names: &'a [HbsAtom]) -> TemplateScope<'a> {
        TemplateScope {
            names,
            parent: None,
        }
    }

    /// Scope of a body which introduces `names`
    pub fn nested(names: &'a [HbsAtom], parent: &'a TemplateScope<'a>) -> TemplateScope<'a> {
        TemplateScope {
            names,
            parent: Some(parent),
        }
    }

    /// Whether `name` is bound by a block param at this point
    pub fn has_binding(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(scope) = current {
            if scope.names.iter().any(|it| &**it == name) {
                return true;
            }
            current = scope.parent;
        }
        false
    }
}
