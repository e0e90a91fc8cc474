//! Static analysis of the options object passed to a template site.

use hbsc_core::HbsAtom;
use serde_json::{Map, Number, Value};
use swc_core::{
    common::{Span, Spanned},
    ecma::ast::*,
};

use crate::{
    atoms::{ARGUMENTS, COMPONENT, EVAL, SCOPE},
    error::{TemplateSiteError, TemplateSiteErrorKind},
    modules::{Capabilities, Capability},
    scope_locals::ScopeLocals,
};

/// Options of one template site
#[derive(Debug, Default)]
pub struct StaticOptions {
    /// Everything forwarded to the compiler, in source order
    pub passthrough: Map<String, Value>,
    /// Declared `scope`, seeding an explicit ledger
    pub scope: Option<ScopeLocals>,
    /// Whether a valid `eval` was given
    pub has_eval: bool,
    /// The backing class expression
    pub component: Option<Box<Expr>>,
}

impl StaticOptions {
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.passthrough.get(key).and_then(Value::as_bool)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.passthrough.get(key).and_then(Value::as_str)
    }
}

type ParseResult<T> = Result<T, TemplateSiteError>;

/// Parses the options object of a site.
/// `invoked` is the local name of the callee, used for error messages.
pub fn parse_static_options(
    invoked: &str,
    options: &ObjectLit,
    capabilities: Capabilities,
) -> ParseResult<StaticOptions> {
    let mut result = StaticOptions::default();

    for prop in options.props.iter() {
        let prop = match prop {
            PropOrSpread::Prop(prop) => prop,
            PropOrSpread::Spread(spread) => {
                return Err(site_error(
                    spread.dot3_token,
                    TemplateSiteErrorKind::OptionsSpread(invoked.to_owned()),
                ))
            }
        };

        match **prop {
            Prop::Shorthand(ref ident) => {
                let value = Expr::Ident(ident.clone());
                parse_option(invoked, &ident.sym, &value, capabilities, &mut result)?;
            }

            Prop::KeyValue(ref kv) => {
                let key = static_key(&kv.key).ok_or_else(|| {
                    site_error(
                        kv.key.span(),
                        TemplateSiteErrorKind::OptionsNonStaticKey(invoked.to_owned()),
                    )
                })?;
                parse_option(invoked, &key, &kv.value, capabilities, &mut result)?;
            }

            Prop::Method(ref method) => {
                let key = static_key(&method.key).ok_or_else(|| {
                    site_error(
                        method.key.span(),
                        TemplateSiteErrorKind::OptionsNonStaticKey(invoked.to_owned()),
                    )
                })?;

                if key == *SCOPE && capabilities.contains(Capability::Scope) {
                    result.scope = Some(parse_scope_function(invoked, &method.function)?);
                } else if key == *EVAL && capabilities.contains(Capability::Rfc931) {
                    parse_eval_function(&method.function)?;
                    result.has_eval = true;
                } else {
                    return Err(site_error(
                        method.function.span,
                        TemplateSiteErrorKind::OptionMethod {
                            invoked: invoked.to_owned(),
                            property: key.to_string(),
                        },
                    ));
                }
            }

            Prop::Getter(GetterProp { ref key, span, .. })
            | Prop::Setter(SetterProp { ref key, span, .. }) => {
                return Err(site_error(
                    span,
                    TemplateSiteErrorKind::OptionMethod {
                        invoked: invoked.to_owned(),
                        property: static_key(key)
                            .map(|key| key.to_string())
                            .unwrap_or_default(),
                    },
                ))
            }

            Prop::Assign(_) => {
                return Err(site_error(
                    prop.span(),
                    TemplateSiteErrorKind::OptionsNonStaticKey(invoked.to_owned()),
                ))
            }
        }
    }

    Ok(result)
}

fn parse_option(
    invoked: &str,
    key: &HbsAtom,
    value: &Expr,
    capabilities: Capabilities,
    result: &mut StaticOptions,
) -> ParseResult<()> {
    if *key == *SCOPE && capabilities.contains(Capability::Scope) {
        result.scope = Some(parse_scope(invoked, value)?);
    } else if *key == *EVAL && capabilities.contains(Capability::Rfc931) {
        match unwrap_parens(value) {
            Expr::Fn(fn_expr) => parse_eval_function(&fn_expr.function)?,
            other => {
                return Err(site_error(
                    other.span(),
                    TemplateSiteErrorKind::EvalSyntax(invoked.to_owned()),
                ))
            }
        }
        result.has_eval = true;
    } else if *key == *COMPONENT && capabilities.contains(Capability::Rfc931) {
        result.component = Some(Box::new(value.clone()));
    } else {
        let value = static_value(invoked, value)?;
        result.passthrough.insert(key.to_string(), value);
    }
    Ok(())
}

/// Converts a literal expression to its JSON counterpart
fn static_value(invoked: &str, expr: &Expr) -> ParseResult<Value> {
    let expr = unwrap_parens(expr);
    let value = match expr {
        Expr::Lit(Lit::Str(s)) => Value::String(s.value.to_string()),
        Expr::Lit(Lit::Bool(b)) => Value::Bool(b.value),
        Expr::Lit(Lit::Null(_)) => Value::Null,
        Expr::Lit(Lit::Num(n)) => number_value(n.value).ok_or_else(|| non_static(invoked, expr))?,

        Expr::Unary(UnaryExpr {
            op: UnaryOp::Minus,
            arg,
            ..
        }) => match unwrap_parens(arg) {
            Expr::Lit(Lit::Num(n)) => {
                number_value(-n.value).ok_or_else(|| non_static(invoked, expr))?
            }
            _ => return Err(non_static(invoked, expr)),
        },

        Expr::Array(array) => {
            let mut values = Vec::with_capacity(array.elems.len());
            for elem in array.elems.iter() {
                match elem {
                    None => values.push(Value::Null),
                    Some(ExprOrSpread {
                        spread: Some(spread),
                        ..
                    }) => {
                        return Err(site_error(*spread, TemplateSiteErrorKind::ArraySpread));
                    }
                    Some(ExprOrSpread { expr, .. }) => values.push(static_value(invoked, expr)?),
                }
            }
            Value::Array(values)
        }

        Expr::Object(object) => {
            let mut map = Map::new();
            for prop in object.props.iter() {
                let (key, value) = match prop {
                    PropOrSpread::Spread(spread) => {
                        return Err(site_error(
                            spread.dot3_token,
                            TemplateSiteErrorKind::OptionsSpread(invoked.to_owned()),
                        ))
                    }
                    PropOrSpread::Prop(prop) => match **prop {
                        Prop::KeyValue(ref kv) => {
                            let key = static_key(&kv.key).ok_or_else(|| {
                                site_error(
                                    kv.key.span(),
                                    TemplateSiteErrorKind::OptionsNonStaticKey(invoked.to_owned()),
                                )
                            })?;
                            (key, static_value(invoked, &kv.value)?)
                        }
                        Prop::Method(ref method) => {
                            return Err(site_error(
                                method.function.span,
                                TemplateSiteErrorKind::OptionMethod {
                                    invoked: invoked.to_owned(),
                                    property: static_key(&method.key)
                                        .map(|key| key.to_string())
                                        .unwrap_or_default(),
                                },
                            ))
                        }
                        ref other => return Err(non_static_prop(invoked, other)),
                    },
                };
                map.insert(key.to_string(), value);
            }
            Value::Object(map)
        }

        _ => return Err(non_static(invoked, expr)),
    };

    Ok(value)
}

fn number_value(value: f64) -> Option<Value> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Some(Value::Number(Number::from(value as i64)));
    }
    Number::from_f64(value).map(Value::Number)
}

/// `scope: () => ({ ... })` and its function/method forms
fn parse_scope(invoked: &str, value: &Expr) -> ParseResult<ScopeLocals> {
    let value = unwrap_parens(value);
    match value {
        Expr::Object(object) => Err(site_error(
            object.span,
            TemplateSiteErrorKind::ScopeObjectLiteral,
        )),

        Expr::Arrow(arrow) => {
            let returned = match *arrow.body {
                BlockStmtOrExpr::Expr(ref expr) => &**expr,
                BlockStmtOrExpr::BlockStmt(ref block) => single_return(block)
                    .ok_or_else(|| site_error(block.span, TemplateSiteErrorKind::ScopeReturnCount))?,
            };
            parse_scope_object(invoked, returned)
        }

        Expr::Fn(fn_expr) => parse_scope_function(invoked, &fn_expr.function),

        other => Err(site_error(
            other.span(),
            TemplateSiteErrorKind::ScopeNotObject(invoked.to_owned()),
        )),
    }
}

fn parse_scope_function(invoked: &str, function: &Function) -> ParseResult<ScopeLocals> {
    let returned = function
        .body
        .as_ref()
        .and_then(single_return)
        .ok_or_else(|| site_error(function.span, TemplateSiteErrorKind::ScopeReturnCount))?;
    parse_scope_object(invoked, returned)
}

fn parse_scope_object(invoked: &str, returned: &Expr) -> ParseResult<ScopeLocals> {
    let Expr::Object(object) = unwrap_parens(returned) else {
        return Err(site_error(
            returned.span(),
            TemplateSiteErrorKind::ScopeNotObject(invoked.to_owned()),
        ));
    };

    let mut locals = ScopeLocals::explicit();
    for prop in object.props.iter() {
        let prop = match prop {
            PropOrSpread::Prop(prop) => prop,
            PropOrSpread::Spread(spread) => {
                return Err(site_error(
                    spread.dot3_token,
                    TemplateSiteErrorKind::ScopeSpread(invoked.to_owned()),
                ))
            }
        };

        match **prop {
            Prop::Shorthand(ref ident) => locals.add(ident.sym.clone(), Some(ident.sym.clone())),

            Prop::KeyValue(ref kv) => {
                let key = static_key(&kv.key).ok_or_else(|| {
                    site_error(
                        kv.key.span(),
                        TemplateSiteErrorKind::ScopeNonStaticKey(invoked.to_owned()),
                    )
                })?;

                let js_name = match unwrap_parens(&kv.value) {
                    Expr::Ident(ident) => ident.sym.clone(),
                    Expr::This(_) => crate::atoms::THIS.clone(),
                    other => {
                        return Err(site_error(
                            other.span(),
                            TemplateSiteErrorKind::ScopeNotReference {
                                invoked: invoked.to_owned(),
                                key: key.to_string(),
                                found: expr_kind(other),
                            },
                        ))
                    }
                };
                locals.add(key, Some(js_name));
            }

            Prop::Method(_) | Prop::Getter(_) | Prop::Setter(_) => {
                return Err(site_error(
                    prop.span(),
                    TemplateSiteErrorKind::ScopeMethod(invoked.to_owned()),
                ))
            }

            Prop::Assign(_) => {
                return Err(site_error(
                    prop.span(),
                    TemplateSiteErrorKind::ScopeNonStaticKey(invoked.to_owned()),
                ))
            }
        }
    }

    Ok(locals)
}

/// Checks that the function is exactly `function () { return eval(arguments[0]) }`
fn parse_eval_function(function: &Function) -> ParseResult<()> {
    let returned = function
        .body
        .as_ref()
        .and_then(single_return)
        .ok_or_else(|| site_error(function.span, TemplateSiteErrorKind::EvalReturnCount))?;

    let Expr::Call(call) = unwrap_parens(returned) else {
        return Err(site_error(returned.span(), TemplateSiteErrorKind::EvalNotCall));
    };

    match call.callee {
        Callee::Expr(ref callee) if matches!(**callee, Expr::Ident(ref ident) if ident.sym == *EVAL) => {}
        _ => return Err(site_error(call.callee.span(), TemplateSiteErrorKind::EvalCallee)),
    }

    let [ExprOrSpread { spread: None, expr: arg }] = call.args.as_slice() else {
        return Err(site_error(call.span, TemplateSiteErrorKind::EvalArgumentCount));
    };

    let Expr::Member(member) = unwrap_parens(arg) else {
        return Err(site_error(arg.span(), TemplateSiteErrorKind::EvalArgumentNotMember));
    };

    if !matches!(*member.obj, Expr::Ident(ref ident) if ident.sym == *ARGUMENTS) {
        return Err(site_error(member.obj.span(), TemplateSiteErrorKind::EvalWrongObject));
    }

    let is_first_argument = matches!(
        member.prop,
        MemberProp::Computed(ComputedPropName { ref expr, .. })
            if matches!(**expr, Expr::Lit(Lit::Num(ref n)) if n.value == 0.0)
    );
    if !is_first_argument {
        return Err(site_error(member.prop.span(), TemplateSiteErrorKind::EvalWrongProperty));
    }

    Ok(())
}

/// The argument of the only `return` of a block.
/// `None` when there are no or several top-level returns, or the return has no argument.
fn single_return(block: &BlockStmt) -> Option<&Expr> {
    let mut returns = block.stmts.iter().filter_map(|stmt| match stmt {
        Stmt::Return(return_stmt) => Some(return_stmt),
        _ => None,
    });

    match (returns.next(), returns.next()) {
        (Some(return_stmt), None) => return_stmt.arg.as_deref(),
        _ => None,
    }
}

fn static_key(key: &PropName) -> Option<HbsAtom> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.clone()),
        PropName::Str(s) => Some(s.value.clone()),
        _ => None,
    }
}

pub fn unwrap_parens(expr: &Expr) -> &Expr {
    let mut current = expr;
    while let Expr::Paren(paren) = current {
        current = &paren.expr;
    }
    current
}

fn site_error(span: Span, kind: TemplateSiteErrorKind) -> TemplateSiteError {
    TemplateSiteError::new(span, kind)
}

fn non_static(invoked: &str, expr: &Expr) -> TemplateSiteError {
    site_error(
        expr.span(),
        TemplateSiteErrorKind::NonStaticOption {
            invoked: invoked.to_owned(),
            found: expr_kind(expr),
        },
    )
}

fn non_static_prop(invoked: &str, prop: &Prop) -> TemplateSiteError {
    site_error(
        prop.span(),
        TemplateSiteErrorKind::NonStaticOption {
            invoked: invoked.to_owned(),
            found: match prop {
                Prop::Shorthand(_) => "Identifier",
                Prop::Getter(_) | Prop::Setter(_) => "ObjectMethod",
                _ => "ObjectProperty",
            },
        },
    )
}

/// ESTree node type name of `expr`, as quoted in error messages
pub fn expr_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::This(_) => "ThisExpression",
        Expr::Array(_) => "ArrayExpression",
        Expr::Object(_) => "ObjectExpression",
        Expr::Fn(_) => "FunctionExpression",
        Expr::Unary(_) => "UnaryExpression",
        Expr::Update(_) => "UpdateExpression",
        Expr::Bin(bin) => match bin.op {
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::NullishCoalescing => {
                "LogicalExpression"
            }
            _ => "BinaryExpression",
        },
        Expr::Assign(_) => "AssignmentExpression",
        Expr::Member(_) => "MemberExpression",
        Expr::SuperProp(_) => "MemberExpression",
        Expr::Cond(_) => "ConditionalExpression",
        Expr::Call(_) => "CallExpression",
        Expr::New(_) => "NewExpression",
        Expr::Seq(_) => "SequenceExpression",
        Expr::Ident(_) => "Identifier",
        Expr::Lit(lit) => match lit {
            Lit::Str(_) => "StringLiteral",
            Lit::Bool(_) => "BooleanLiteral",
            Lit::Null(_) => "NullLiteral",
            Lit::Num(_) => "NumericLiteral",
            Lit::BigInt(_) => "BigIntLiteral",
            Lit::Regex(_) => "RegExpLiteral",
            Lit::JSXText(_) => "JSXText",
        },
        Expr::Tpl(_) => "TemplateLiteral",
        Expr::TaggedTpl(_) => "TaggedTemplateExpression",
        Expr::Arrow(_) => "ArrowFunctionExpression",
        Expr::Class(_) => "ClassExpression",
        Expr::Yield(_) => "YieldExpression",
        Expr::MetaProp(_) => "MetaProperty",
        Expr::Await(_) => "AwaitExpression",
        Expr::Paren(paren) => expr_kind(&paren.expr),
        Expr::OptChain(_) => "OptionalMemberExpression",
        _ => "Expression",
    }
}
