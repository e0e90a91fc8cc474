//! Template AST for the Handlebars/Glimmer subset understood by `hbsc`.
//!
//! The node set mirrors Glimmer's ASTv1: statements (text, mustaches, blocks,
//! elements, comments) containing expressions (paths, sub-expressions,
//! literals). Block params are kept on the node introducing them, so that
//! the [`visit`] module can compute which names are bound where.

use smallvec::SmallVec;

use crate::HbsAtom;

pub mod builders;
mod scope;
pub mod visit;

pub use scope::TemplateScope;

/// Block params such as `as |item index|`
pub type BlockParams = SmallVec<[HbsAtom; 2]>;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Template {
    pub body: Vec<Statement>,
    /// Params available to the whole template. Usually empty.
    pub block_params: BlockParams,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Text(TextNode),
    Mustache(MustacheStatement),
    Block(BlockStatement),
    Element(ElementNode),
    /// `<!-- -->`
    Comment(CommentStatement),
    /// `{{!-- --}}` or `{{! }}`
    MustacheComment(CommentStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    /// Raw text, exactly as written. Entities are not decoded.
    pub chars: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentStatement {
    pub value: String,
}

/// `{{path param key=value}}`
#[derive(Debug, Clone, PartialEq)]
pub struct MustacheStatement {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    /// `{{{triple-stash}}}`
    pub trusting: bool,
}

/// `{{#path params as |x|}}program{{else}}inverse{{/path}}`
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    pub program: Block,
    pub inverse: Option<Block>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Block {
    pub body: Vec<Statement>,
    pub block_params: BlockParams,
    /// This inverse was written as `{{else if ...}}` and holds exactly one block
    pub chained: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: HbsAtom,
    pub attributes: Vec<AttrNode>,
    pub modifiers: Vec<ElementModifierStatement>,
    /// Bound only within `children`
    pub block_params: BlockParams,
    pub children: Vec<Statement>,
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrNode {
    /// Attribute name, including the `@` of component arguments
    pub name: HbsAtom,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// `class="foo"` or a valueless attribute (empty text)
    Text(TextNode),
    /// `class={{foo}}`
    Mustache(MustacheStatement),
    /// `class="a {{b}}"`
    Concat(Vec<ConcatPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConcatPart {
    Text(TextNode),
    Mustache(MustacheStatement),
}

/// `<div {{on "click" this.go}}>`
#[derive(Debug, Clone, PartialEq)]
pub struct ElementModifierStatement {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Path(PathExpression),
    SubExpression(SubExpression),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    pub head: PathHead,
    pub tail: Vec<HbsAtom>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathHead {
    /// `this`
    This,
    /// `@name`, stored without the `@`
    At(HbsAtom),
    /// Any other name, either bound by a block param or free
    Var(HbsAtom),
}

/// `(path params key=value)`
#[derive(Debug, Clone, PartialEq)]
pub struct SubExpression {
    pub path: Box<Expression>,
    pub params: Vec<Expression>,
    pub hash: Hash,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Undefined,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Hash {
    pub pairs: Vec<HashPair>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: HbsAtom,
    pub value: Expression,
}

impl PathExpression {
    /// The free-variable name this path starts with, if any.
    /// `this` counts as the pseudo-name `"this"`, `@args` never count.
    pub fn head_name(&self) -> Option<&str> {
        match self.head {
            PathHead::This => Some("this"),
            PathHead::Var(ref name) => Some(name),
            PathHead::At(_) => None,
        }
    }

    /// Original dotted form, e.g. `this.foo` or `@bar.baz`
    pub fn original(&self) -> String {
        let mut out = match self.head {
            PathHead::This => String::from("this"),
            PathHead::At(ref name) => format!("@{}", name),
            PathHead::Var(ref name) => name.to_string(),
        };
        for part in self.tail.iter() {
            out.push('.');
            out.push_str(part);
        }
        out
    }
}

impl ElementNode {
    /// The part of the tag that may refer to a binding: `foo` in `<foo.bar>`.
    /// Named blocks (`<:header>`) and argument tags (`<@arg>`) have none.
    pub fn tag_head(&self) -> Option<&str> {
        let head = self.tag.split('.').next().unwrap_or_default();
        if head.is_empty() || head.starts_with(':') || head.starts_with('@') {
            return None;
        }
        Some(head)
    }
}
