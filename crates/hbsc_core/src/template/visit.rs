//! Scope-aware mutable traversal of the template AST.
//!
//! Every hook receives the [`TemplateScope`] in effect at the node, so that
//! plugins can tell block-param references from free ones, and can pass the
//! scope on to [`crate::JsUtils`] as the binding target.
//! Default hook implementations recurse through the matching `walk_*` function.

use super::*;
use crate::PluginError;

pub type VisitResult = Result<(), PluginError>;

pub trait VisitMut {
    fn visit_mut_template(&mut self, n: &mut Template) -> VisitResult {
        walk_template(self, n)
    }

    fn visit_mut_statement(&mut self, n: &mut Statement, scope: &TemplateScope<'_>) -> VisitResult {
        walk_statement(self, n, scope)
    }

    fn visit_mut_text(&mut self, _n: &mut TextNode, _scope: &TemplateScope<'_>) -> VisitResult {
        Ok(())
    }

    fn visit_mut_mustache(
        &mut self,
        n: &mut MustacheStatement,
        scope: &TemplateScope<'_>,
    ) -> VisitResult {
        walk_mustache(self, n, scope)
    }

    fn visit_mut_block(&mut self, n: &mut BlockStatement, scope: &TemplateScope<'_>) -> VisitResult {
        walk_block(self, n, scope)
    }

    fn visit_mut_element(&mut self, n: &mut ElementNode, scope: &TemplateScope<'_>) -> VisitResult {
        walk_element(self, n, scope)
    }

    fn visit_mut_attr(&mut self, n: &mut AttrNode, scope: &TemplateScope<'_>) -> VisitResult {
        walk_attr(self, n, scope)
    }

    fn visit_mut_modifier(
        &mut self,
        n: &mut ElementModifierStatement,
        scope: &TemplateScope<'_>,
    ) -> VisitResult {
        walk_call(self, &mut n.path, &mut n.params, &mut n.hash, scope)
    }

    fn visit_mut_expression(&mut self, n: &mut Expression, scope: &TemplateScope<'_>) -> VisitResult {
        walk_expression(self, n, scope)
    }

    fn visit_mut_path(&mut self, _n: &mut PathExpression, _scope: &TemplateScope<'_>) -> VisitResult {
        Ok(())
    }
}

pub fn walk_template<V: VisitMut + ?Sized>(v: &mut V, n: &mut Template) -> VisitResult {
    let Template { body, block_params } = n;
    let scope = TemplateScope::root(block_params);
    walk_statements(v, body, &scope)
}

pub fn walk_statements<V: VisitMut + ?Sized>(
    v: &mut V,
    body: &mut [Statement],
    scope: &TemplateScope<'_>,
) -> VisitResult {
    for statement in body.iter_mut() {
        v.visit_mut_statement(statement, scope)?;
    }
    Ok(())
}

pub fn walk_statement<V: VisitMut + ?Sized>(
    v: &mut V,
    n: &mut Statement,
    scope: &TemplateScope<'_>,
) -> VisitResult {
    match n {
        Statement::Text(text) => v.visit_mut_text(text, scope),
        Statement::Mustache(mustache) => v.visit_mut_mustache(mustache, scope),
        Statement::Block(block) => v.visit_mut_block(block, scope),
        Statement::Element(element) => v.visit_mut_element(element, scope),
        Statement::Comment(_) | Statement::MustacheComment(_) => Ok(()),
    }
}

pub fn walk_mustache<V: VisitMut + ?Sized>(
    v: &mut V,
    n: &mut MustacheStatement,
    scope: &TemplateScope<'_>,
) -> VisitResult {
    walk_call(v, &mut n.path, &mut n.params, &mut n.hash, scope)
}

/// Callee, params and hash of a mustache, block, modifier or sub-expression
pub fn walk_call<V: VisitMut + ?Sized>(
    v: &mut V,
    path: &mut Expression,
    params: &mut [Expression],
    hash: &mut Hash,
    scope: &TemplateScope<'_>,
) -> VisitResult {
    v.visit_mut_expression(path, scope)?;
    for param in params.iter_mut() {
        v.visit_mut_expression(param, scope)?;
    }
    for pair in hash.pairs.iter_mut() {
        v.visit_mut_expression(&mut pair.value, scope)?;
    }
    Ok(())
}

pub fn walk_block<V: VisitMut + ?Sized>(
    v: &mut V,
    n: &mut BlockStatement,
    scope: &TemplateScope<'_>,
) -> VisitResult {
    walk_call(v, &mut n.path, &mut n.params, &mut n.hash, scope)?;

    // Block params are only visible inside the block they belong to
    let Block {
        body, block_params, ..
    } = &mut n.program;
    let program_scope = TemplateScope::nested(block_params, scope);
    walk_statements(v, body, &program_scope)?;

    if let Some(Block {
        body, block_params, ..
    }) = n.inverse.as_mut()
    {
        let inverse_scope = TemplateScope::nested(block_params, scope);
        walk_statements(v, body, &inverse_scope)?;
    }

    Ok(())
}

pub fn walk_element<V: VisitMut + ?Sized>(
    v: &mut V,
    n: &mut ElementNode,
    scope: &TemplateScope<'_>,
) -> VisitResult {
    let ElementNode {
        attributes,
        modifiers,
        block_params,
        children,
        ..
    } = n;

    // Attributes and modifiers see the outer scope
    for attr in attributes.iter_mut() {
        v.visit_mut_attr(attr, scope)?;
    }
    for modifier in modifiers.iter_mut() {
        v.visit_mut_modifier(modifier, scope)?;
    }

    let children_scope = TemplateScope::nested(block_params, scope);
    walk_statements(v, children, &children_scope)
}

pub fn walk_attr<V: VisitMut + ?Sized>(
    v: &mut V,
    n: &mut AttrNode,
    scope: &TemplateScope<'_>,
) -> VisitResult {
    match n.value {
        AttrValue::Text(ref mut text) => v.visit_mut_text(text, scope),
        AttrValue::Mustache(ref mut mustache) => v.visit_mut_mustache(mustache, scope),
        AttrValue::Concat(ref mut parts) => {
            for part in parts.iter_mut() {
                match part {
                    ConcatPart::Text(text) => v.visit_mut_text(text, scope)?,
                    ConcatPart::Mustache(mustache) => v.visit_mut_mustache(mustache, scope)?,
                }
            }
            Ok(())
        }
    }
}

pub fn walk_expression<V: VisitMut + ?Sized>(
    v: &mut V,
    n: &mut Expression,
    scope: &TemplateScope<'_>,
) -> VisitResult {
    match n {
        Expression::Path(path) => v.visit_mut_path(path, scope),
        Expression::SubExpression(sexpr) => {
            let SubExpression { path, params, hash } = sexpr;
            walk_call(v, path, params, hash, scope)
        }
        Expression::Literal(_) => Ok(()),
    }
}
