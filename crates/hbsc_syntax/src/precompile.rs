//! Wire encoding of a template.
//!
//! The body is encoded as nested JSON arrays of opcodes. A reference to one
//! of the compile-time locals is encoded positionally as `[32, slot]`, and the
//! emitted `scope` arrow returns the locals in the same order, so that slot N
//! is always supplied by the Nth local.

use std::hash::Hasher;

use fxhash::FxHasher64;
use hbsc_core::{
    template::{TemplateScope, *},
    HbsAtom,
};
use serde_json::{json, Value};

mod op {
    pub const TEXT: u8 = 1;
    pub const APPEND: u8 = 2;
    pub const BLOCK: u8 = 3;
    pub const ELEMENT: u8 = 4;
    pub const COMMENT: u8 = 5;
    pub const STATIC_ATTR: u8 = 10;
    pub const DYNAMIC_ATTR: u8 = 11;
    pub const CONCAT_ATTR: u8 = 12;
    pub const MODIFIER: u8 = 13;
    pub const UNDEFINED: u8 = 27;
    pub const CALL: u8 = 28;
    pub const THIS: u8 = 30;
    pub const ARG: u8 = 31;
    pub const LEXICAL: u8 = 32;
    pub const BLOCK_PARAM: u8 = 33;
    pub const FREE: u8 = 34;
}

pub struct WireTemplate<'a> {
    pub template: &'a Template,
    /// Source text, only used for the id
    pub contents: &'a str,
    pub locals: &'a [HbsAtom],
    pub module_name: &'a str,
    pub strict_mode: bool,
}

impl WireTemplate<'_> {
    /// Produces the source of a host object expression
    pub fn to_source(&self) -> String {
        let block = Encoder {
            locals: self.locals,
        }
        .encode_template(self.template)
        .to_string();

        let mut hasher = FxHasher64::default();
        hasher.write(self.module_name.as_bytes());
        hasher.write(self.contents.as_bytes());
        hasher.write(block.as_bytes());
        let id = format!("{:016x}", hasher.finish());

        let mut out = String::with_capacity(block.len() + 128);
        out.push_str("{\n  id: ");
        out.push_str(&Value::String(id).to_string());
        out.push_str(",\n  block: ");
        out.push_str(&Value::String(block).to_string());
        out.push_str(",\n  moduleName: ");
        out.push_str(&Value::String(self.module_name.to_owned()).to_string());

        if !self.locals.is_empty() {
            out.push_str(",\n  scope: () => [");
            for (idx, local) in self.locals.iter().enumerate() {
                if idx != 0 {
                    out.push_str(", ");
                }
                out.push_str(local);
            }
            out.push(']');
        }

        out.push_str(",\n  isStrictMode: ");
        out.push_str(if self.strict_mode { "true" } else { "false" });
        out.push_str("\n}");
        out
    }
}

fn names(block_params: &[HbsAtom]) -> Vec<&str> {
    block_params.iter().map(|name| &**name).collect()
}

struct Encoder<'a> {
    locals: &'a [HbsAtom],
}

impl Encoder<'_> {
    fn encode_template(&self, template: &Template) -> Value {
        let scope = TemplateScope::root(&template.block_params);
        json!([self.encode_statements(&template.body, &scope), names(&template.block_params)])
    }

    fn encode_statements(&self, body: &[Statement], scope: &TemplateScope<'_>) -> Value {
        Value::Array(
            body.iter()
                .filter_map(|statement| self.encode_statement(statement, scope))
                .collect(),
        )
    }

    fn encode_statement(&self, statement: &Statement, scope: &TemplateScope<'_>) -> Option<Value> {
        let encoded = match statement {
            Statement::Text(text) => json!([op::TEXT, text.chars]),
            Statement::Mustache(mustache) => json!([
                op::APPEND,
                self.encode_expression(&mustache.path, scope),
                self.encode_params(&mustache.params, scope),
                self.encode_hash(&mustache.hash, scope),
                mustache.trusting
            ]),
            Statement::Block(block) => json!([
                op::BLOCK,
                self.encode_expression(&block.path, scope),
                self.encode_params(&block.params, scope),
                self.encode_hash(&block.hash, scope),
                self.encode_block(&block.program, scope),
                block
                    .inverse
                    .as_ref()
                    .map_or(Value::Null, |inverse| self.encode_block(inverse, scope))
            ]),
            Statement::Element(element) => self.encode_element(element, scope),
            Statement::Comment(comment) => json!([op::COMMENT, comment.value]),
            Statement::MustacheComment(_) => return None,
        };

        Some(encoded)
    }

    fn encode_block(&self, block: &Block, scope: &TemplateScope<'_>) -> Value {
        let inner = TemplateScope::nested(&block.block_params, scope);
        json!([self.encode_statements(&block.body, &inner), names(&block.block_params)])
    }

    fn encode_element(&self, element: &ElementNode, scope: &TemplateScope<'_>) -> Value {
        // A tag resolving to a local (or to a block param) is a component invocation
        let tag = match element.tag_head() {
            Some(head) if scope.has_binding(head) || self.slot_of(head).is_some() => {
                self.encode_path(&builders::path_expression(&element.tag), scope)
            }
            _ => Value::String(element.tag.to_string()),
        };

        let attributes: Vec<Value> = element
            .attributes
            .iter()
            .map(|attr| match attr.value {
                AttrValue::Text(ref text) => json!([op::STATIC_ATTR, &*attr.name, text.chars]),
                AttrValue::Mustache(ref mustache) => json!([
                    op::DYNAMIC_ATTR,
                    &*attr.name,
                    self.encode_call(&mustache.path, &mustache.params, &mustache.hash, scope)
                ]),
                AttrValue::Concat(ref parts) => {
                    let parts: Vec<Value> = parts
                        .iter()
                        .map(|part| match part {
                            ConcatPart::Text(text) => Value::String(text.chars.clone()),
                            ConcatPart::Mustache(mustache) => self.encode_call(
                                &mustache.path,
                                &mustache.params,
                                &mustache.hash,
                                scope,
                            ),
                        })
                        .collect();
                    json!([op::CONCAT_ATTR, &*attr.name, parts])
                }
            })
            .collect();

        let modifiers: Vec<Value> = element
            .modifiers
            .iter()
            .map(|modifier| {
                json!([
                    op::MODIFIER,
                    self.encode_call(&modifier.path, &modifier.params, &modifier.hash, scope)
                ])
            })
            .collect();

        let children_scope = TemplateScope::nested(&element.block_params, scope);
        json!([
            op::ELEMENT,
            tag,
            attributes,
            modifiers,
            self.encode_statements(&element.children, &children_scope),
            names(&element.block_params)
        ])
    }

    fn encode_call(
        &self,
        path: &Expression,
        params: &[Expression],
        hash: &Hash,
        scope: &TemplateScope<'_>,
    ) -> Value {
        if params.is_empty() && hash.pairs.is_empty() {
            return self.encode_expression(path, scope);
        }

        json!([
            op::CALL,
            self.encode_expression(path, scope),
            self.encode_params(params, scope),
            self.encode_hash(hash, scope)
        ])
    }

    fn encode_params(&self, params: &[Expression], scope: &TemplateScope<'_>) -> Value {
        if params.is_empty() {
            return Value::Null;
        }
        Value::Array(
            params
                .iter()
                .map(|param| self.encode_expression(param, scope))
                .collect(),
        )
    }

    fn encode_hash(&self, hash: &Hash, scope: &TemplateScope<'_>) -> Value {
        if hash.pairs.is_empty() {
            return Value::Null;
        }

        let keys: Vec<&str> = hash.pairs.iter().map(|pair| &*pair.key).collect();
        let values: Vec<Value> = hash
            .pairs
            .iter()
            .map(|pair| self.encode_expression(&pair.value, scope))
            .collect();
        json!([keys, values])
    }

    fn encode_expression(&self, expr: &Expression, scope: &TemplateScope<'_>) -> Value {
        match expr {
            Expression::Path(path) => self.encode_path(path, scope),
            Expression::SubExpression(sexpr) => json!([
                op::CALL,
                self.encode_expression(&sexpr.path, scope),
                self.encode_params(&sexpr.params, scope),
                self.encode_hash(&sexpr.hash, scope)
            ]),
            Expression::Literal(Literal::String(value)) => json!(value),
            Expression::Literal(Literal::Number(value)) => json!(value),
            Expression::Literal(Literal::Boolean(value)) => json!(value),
            Expression::Literal(Literal::Null) => Value::Null,
            Expression::Literal(Literal::Undefined) => json!([op::UNDEFINED]),
        }
    }

    fn encode_path(&self, path: &PathExpression, scope: &TemplateScope<'_>) -> Value {
        let mut encoded = match path.head {
            PathHead::At(ref name) => vec![json!(op::ARG), json!(&**name)],
            PathHead::This => match self.slot_of("this") {
                Some(slot) if !scope.has_binding("this") => vec![json!(op::LEXICAL), json!(slot)],
                _ => vec![json!(op::THIS)],
            },
            PathHead::Var(ref name) if scope.has_binding(name) => {
                vec![json!(op::BLOCK_PARAM), json!(&**name)]
            }
            PathHead::Var(ref name) => match self.slot_of(name) {
                Some(slot) => vec![json!(op::LEXICAL), json!(slot)],
                None => vec![json!(op::FREE), json!(&**name)],
            },
        };

        encoded.extend(path.tail.iter().map(|part| json!(&**part)));
        Value::Array(encoded)
    }

    fn slot_of(&self, name: &str) -> Option<usize> {
        self.locals.iter().position(|local| &**local == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_template;
    use hbsc_core::hbs_atom;

    fn encode(template: &str, locals: &[HbsAtom]) -> String {
        let parsed = parse_template(template).expect("template should parse");
        WireTemplate {
            template: &parsed,
            contents: template,
            locals,
            module_name: "app/components/foo.js",
            strict_mode: false,
        }
        .to_source()
    }

    fn block_of(source: &str) -> Value {
        let start = source.find("block: ").expect("block") + "block: ".len();
        let end = source[start..].find(",\n").expect("block end") + start;
        let block: String = serde_json::from_str(&source[start..end]).expect("JSON string");
        serde_json::from_str(&block).expect("JSON block")
    }

    #[test]
    fn it_uses_local_order_for_slots() {
        let locals = [hbs_atom!("bar"), hbs_atom!("foo")];
        let source = encode("{{foo}}{{bar}}", &locals);

        assert!(source.contains("scope: () => [bar, foo]"));
        assert_eq!(
            block_of(&source),
            json!([
                [
                    [op::APPEND, [op::LEXICAL, 1], null, null, false],
                    [op::APPEND, [op::LEXICAL, 0], null, null, false]
                ],
                []
            ])
        );
    }

    #[test]
    fn it_encodes_component_tags_as_locals() {
        let locals = [hbs_atom!("HelloWorld")];
        let source = encode("<HelloWorld />", &locals);

        assert_eq!(
            block_of(&source),
            json!([[[op::ELEMENT, [op::LEXICAL, 0], [], [], [], []]], []])
        );
    }

    #[test]
    fn it_prefers_block_params_over_locals() {
        let locals = [hbs_atom!("two")];
        let source = encode(r#"{{#let "x" as |two|}}{{two}}{{/let}}{{two}}"#, &locals);
        let block = block_of(&source);

        assert_eq!(block[0][0][4][0][0][1], json!([op::BLOCK_PARAM, "two"]));
        assert_eq!(block[0][1][1], json!([op::LEXICAL, 0]));
    }

    #[test]
    fn it_omits_scope_without_locals() {
        let source = encode("<div>hello</div>", &[]);
        assert!(!source.contains("scope"));
        assert!(source.contains("isStrictMode: false"));
        assert!(source.contains(r#"moduleName: "app/components/foo.js""#));
    }

    #[test]
    fn it_is_deterministic() {
        let locals = [hbs_atom!("foo")];
        assert_eq!(encode("{{foo}}", &locals), encode("{{foo}}", &locals));
        assert_ne!(encode("{{foo}}", &locals), encode("{{foo}}!", &locals));
    }
}
