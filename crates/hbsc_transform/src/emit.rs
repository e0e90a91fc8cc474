//! Host code synthesized for template sites.

use hbsc_core::HbsAtom;
use swc_core::{
    common::{
        comments::{Comment, CommentKind, Comments},
        Spanned, DUMMY_SP,
    },
    ecma::ast::*,
};

use crate::{
    atoms::{ERROR, SCOPE, THIS},
    host_scope::HostScope,
    imports::ImportUtil,
    name::is_identifier,
    options_parser::unwrap_parens,
    scope_locals::ScopeLocals,
};

/// `() => ({ a, b: c, this: this })`, one property per local in slot order
pub fn scope_arrow(locals: &ScopeLocals) -> Box<Expr> {
    let props = locals
        .entries()
        .map(|(hbs_name, js_name)| {
            let value = reference(js_name);
            let prop = if hbs_name == js_name && *js_name != *THIS {
                Prop::Shorthand(Ident::new_no_ctxt(js_name.clone(), DUMMY_SP))
            } else {
                Prop::KeyValue(KeyValueProp {
                    key: prop_name(hbs_name),
                    value,
                })
            };
            PropOrSpread::Prop(Box::new(prop))
        })
        .collect();

    let object = Expr::Object(ObjectLit {
        span: DUMMY_SP,
        props,
    });

    Box::new(Expr::Arrow(ArrowExpr {
        span: DUMMY_SP,
        ctxt: Default::default(),
        params: vec![],
        body: Box::new(BlockStmtOrExpr::Expr(Box::new(Expr::Paren(ParenExpr {
            span: DUMMY_SP,
            expr: Box::new(object),
        })))),
        is_async: false,
        is_generator: false,
        type_params: None,
        return_type: None,
    }))
}

/// `scope: () => ({ ... })`
pub fn scope_prop(locals: &ScopeLocals) -> PropOrSpread {
    PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
        key: prop_name(&SCOPE),
        value: scope_arrow(locals),
    })))
}

/// Whether `prop` has the static key `name`
pub fn is_prop_named(prop: &PropOrSpread, name: &str) -> bool {
    let PropOrSpread::Prop(prop) = prop else {
        return false;
    };
    let key = match **prop {
        Prop::KeyValue(KeyValueProp { ref key, .. }) => key,
        Prop::Method(MethodProp { ref key, .. }) => key,
        Prop::Shorthand(ref ident) => return &*ident.sym == name,
        _ => return false,
    };
    match key {
        PropName::Ident(ident) => &*ident.sym == name,
        PropName::Str(s) => &*s.value == name,
        _ => false,
    }
}

/// Sets `scope` of an options object, in place when it already exists.
/// Removes it when there are no locals.
pub fn set_scope_prop(options: &mut ObjectLit, locals: &ScopeLocals) {
    let existing = options
        .props
        .iter()
        .position(|prop| is_prop_named(prop, &SCOPE));

    match (existing, locals.is_empty()) {
        (Some(idx), false) => options.props[idx] = scope_prop(locals),
        (Some(idx), true) => {
            options.props.remove(idx);
        }
        (None, false) => options.props.push(scope_prop(locals)),
        (None, true) => {}
    }
}

/// Rewrites the compiled `scope: () => [...]` references to their host-facing names.
/// Every reference written counts towards keeping its import alive.
pub fn remap_scope(
    compiled: &mut Expr,
    locals: &ScopeLocals,
    scope: &HostScope,
    imports: &mut ImportUtil,
) {
    let Some(array) = compiled_scope_array(compiled) else {
        return;
    };

    for elem in array.elems.iter_mut().flatten() {
        let Expr::Ident(ref ident) = *elem.expr else {
            continue;
        };
        let Some(js_name) = locals.get(&ident.sym) else {
            continue;
        };

        let js_name = js_name.clone();
        if js_name != ident.sym {
            let span = ident.span;
            elem.expr = if js_name == *THIS {
                Box::new(Expr::This(ThisExpr { span }))
            } else {
                Box::new(Expr::Ident(Ident::new_no_ctxt(js_name.clone(), span)))
            };
        }
        if js_name != *THIS {
            imports.reference_in(scope, &js_name);
        }
    }
}

fn compiled_scope_array(compiled: &mut Expr) -> Option<&mut ArrayLit> {
    let Expr::Object(object) = compiled else {
        return None;
    };

    object.props.iter_mut().find_map(|prop| {
        if !is_prop_named(prop, &SCOPE) {
            return None;
        }
        let PropOrSpread::Prop(prop) = prop else {
            return None;
        };
        let Prop::KeyValue(ref mut kv) = **prop else {
            return None;
        };
        let Expr::Arrow(ref mut arrow) = *kv.value else {
            return None;
        };
        let BlockStmtOrExpr::Expr(ref mut body) = *arrow.body else {
            return None;
        };

        match unwrap_parens_mut(body) {
            Expr::Array(array) => Some(array),
            _ => None,
        }
    })
}

pub fn unwrap_parens_mut(expr: &mut Expr) -> &mut Expr {
    match expr {
        Expr::Paren(paren) => unwrap_parens_mut(&mut paren.expr),
        other => other,
    }
}

/// Counts every host name of `locals` as referenced by the output
pub fn reference_locals(locals: &ScopeLocals, scope: &HostScope, imports: &mut ImportUtil) {
    for (_, js_name) in locals.entries() {
        if *js_name != *THIS {
            imports.reference_in(scope, js_name);
        }
    }
}

/// Attaches the template text as a leading block comment of `expr`
pub fn add_template_comment(comments: &dyn Comments, expr: &Expr, template: &str) {
    comments.add_leading(
        expr.span_lo(),
        Comment {
            kind: CommentKind::Block,
            span: DUMMY_SP,
            text: format!("\n  {}\n", template.replace("*/", "*\\/")).into(),
        },
    );
}

pub fn call(callee: Ident, args: Vec<Box<Expr>>) -> Box<Expr> {
    Box::new(Expr::Call(CallExpr {
        span: DUMMY_SP,
        ctxt: Default::default(),
        callee: Callee::Expr(Box::new(Expr::Ident(callee))),
        args: args
            .into_iter()
            .map(|expr| ExprOrSpread { spread: None, expr })
            .collect(),
        type_args: None,
    }))
}

/// `(function () { throw new Error("<message>"); })()`
pub fn runtime_error(message: &str) -> Box<Expr> {
    let throw = Stmt::Throw(ThrowStmt {
        span: DUMMY_SP,
        arg: Box::new(Expr::New(NewExpr {
            span: DUMMY_SP,
            ctxt: Default::default(),
            callee: Box::new(Expr::Ident(Ident::new_no_ctxt(ERROR.clone(), DUMMY_SP))),
            args: Some(vec![ExprOrSpread {
                spread: None,
                expr: string(message),
            }]),
            type_args: None,
        })),
    });

    let function = Expr::Fn(FnExpr {
        ident: None,
        function: Box::new(Function {
            params: vec![],
            decorators: vec![],
            span: DUMMY_SP,
            ctxt: Default::default(),
            body: Some(BlockStmt {
                span: DUMMY_SP,
                ctxt: Default::default(),
                stmts: vec![throw],
            }),
            is_generator: false,
            is_async: false,
            type_params: None,
            return_type: None,
        }),
    });

    Box::new(Expr::Call(CallExpr {
        span: DUMMY_SP,
        ctxt: Default::default(),
        callee: Callee::Expr(Box::new(Expr::Paren(ParenExpr {
            span: DUMMY_SP,
            expr: Box::new(function),
        }))),
        args: vec![],
        type_args: None,
    }))
}

pub fn string(value: &str) -> Box<Expr> {
    Box::new(Expr::Lit(Lit::Str(Str {
        span: DUMMY_SP,
        value: value.into(),
        raw: None,
    })))
}

/// Replaces the text of a template literal without placeholders
pub fn set_quasi_text(tpl: &mut Tpl, text: &str) {
    if let Some(quasi) = tpl.quasis.first_mut() {
        quasi.raw = escape_template_text(text).into();
        quasi.cooked = Some(text.into());
    }
    tpl.quasis.truncate(1);
}

/// Escapes text for the raw part of a template literal
pub fn escape_template_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            _ => out.push(ch),
        }
    }
    out
}

/// The static text of a string or placeholder-free template literal argument
pub fn static_text(expr: &Expr) -> Option<String> {
    match unwrap_parens(expr) {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        Expr::Tpl(tpl) if tpl.exprs.is_empty() => Some(tpl_text(tpl)),
        _ => None,
    }
}

/// Joined cooked text of the quasis
pub fn tpl_text(tpl: &Tpl) -> String {
    tpl.quasis
        .iter()
        .map(|quasi| quasi.cooked.as_ref().unwrap_or(&quasi.raw).to_string())
        .collect()
}

fn reference(js_name: &HbsAtom) -> Box<Expr> {
    if *js_name == *THIS {
        Box::new(Expr::This(ThisExpr { span: DUMMY_SP }))
    } else {
        Box::new(Expr::Ident(Ident::new_no_ctxt(js_name.clone(), DUMMY_SP)))
    }
}

/// Identifier key when possible, string key otherwise
pub fn prop_name(name: &HbsAtom) -> PropName {
    if is_identifier(name) {
        PropName::Ident(IdentName::new(name.clone(), DUMMY_SP))
    } else {
        PropName::Str(Str {
            span: DUMMY_SP,
            value: name.clone(),
            raw: None,
        })
    }
}
