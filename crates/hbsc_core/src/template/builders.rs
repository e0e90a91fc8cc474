//! Constructors for template AST nodes, handed to plugins that need to
//! synthesize new nodes.

use super::*;

/// `name` or `name.tail.parts`
pub fn path(original: &str) -> Expression {
    Expression::Path(path_expression(original))
}

/// Parses a dotted path without validation: `this.a`, `@arg.b`, `c.d`
pub fn path_expression(original: &str) -> PathExpression {
    let mut parts = original.split('.');
    let head = match parts.next().unwrap_or_default() {
        "this" => PathHead::This,
        head if head.starts_with('@') => PathHead::At(HbsAtom::from(&head[1..])),
        head => PathHead::Var(HbsAtom::from(head)),
    };

    PathExpression {
        head,
        tail: parts.map(HbsAtom::from).collect(),
    }
}

pub fn string(value: &str) -> Expression {
    Expression::Literal(Literal::String(value.to_owned()))
}

pub fn number(value: f64) -> Expression {
    Expression::Literal(Literal::Number(value))
}

pub fn boolean(value: bool) -> Expression {
    Expression::Literal(Literal::Boolean(value))
}

pub fn text(chars: &str) -> Statement {
    Statement::Text(TextNode {
        chars: chars.to_owned(),
    })
}

pub fn mustache(path: Expression, params: Vec<Expression>, hash: Hash) -> MustacheStatement {
    MustacheStatement {
        path,
        params,
        hash,
        trusting: false,
    }
}

pub fn sexpr(path: Expression, params: Vec<Expression>, hash: Hash) -> Expression {
    Expression::SubExpression(SubExpression {
        path: Box::new(path),
        params,
        hash,
    })
}

pub fn pair(key: &str, value: Expression) -> HashPair {
    HashPair {
        key: HbsAtom::from(key),
        value,
    }
}

pub fn hash(pairs: Vec<HashPair>) -> Hash {
    Hash { pairs }
}

/// `<tag />` without attributes or children
pub fn element(tag: &str) -> ElementNode {
    ElementNode {
        tag: HbsAtom::from(tag),
        attributes: vec![],
        modifiers: vec![],
        block_params: BlockParams::new(),
        children: vec![],
        self_closing: true,
    }
}

pub fn attr(name: &str, value: AttrValue) -> AttrNode {
    AttrNode {
        name: HbsAtom::from(name),
        value,
    }
}
