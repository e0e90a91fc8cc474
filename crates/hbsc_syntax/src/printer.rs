use hbsc_core::template::*;

use crate::parser::VOID_ELEMENTS;

/// Prints a template back to text
pub fn print_template(template: &Template) -> String {
    let mut out = String::with_capacity(64);
    print_statements(&template.body, &mut out);
    out
}

fn print_statements(body: &[Statement], out: &mut String) {
    for statement in body.iter() {
        print_statement(statement, out);
    }
}

fn print_statement(statement: &Statement, out: &mut String) {
    match statement {
        Statement::Text(text) => out.push_str(&text.chars),
        Statement::Mustache(mustache) => print_mustache(mustache, out),
        Statement::Block(block) => {
            out.push_str("{{#");
            print_call(&block.path, &block.params, &block.hash, out);
            print_block_params(&block.program.block_params, out);
            out.push_str("}}");
            print_block_rest(block, out);
            out.push_str("{{/");
            print_expression(&block.path, out);
            out.push_str("}}");
        }
        Statement::Element(element) => print_element(element, out),
        Statement::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(&comment.value);
            out.push_str("-->");
        }
        Statement::MustacheComment(comment) => {
            out.push_str("{{!");
            out.push_str(&comment.value);
            out.push_str("}}");
        }
    }
}

/// Program and inverse of a block, without the closing `{{/...}}`
fn print_block_rest(block: &BlockStatement, out: &mut String) {
    print_statements(&block.program.body, out);

    let Some(ref inverse) = block.inverse else {
        return;
    };

    match inverse.body.as_slice() {
        [Statement::Block(chained)] if inverse.chained => {
            out.push_str("{{else ");
            print_call(&chained.path, &chained.params, &chained.hash, out);
            print_block_params(&chained.program.block_params, out);
            out.push_str("}}");
            print_block_rest(chained, out);
        }
        body => {
            out.push_str("{{else}}");
            print_statements(body, out);
        }
    }
}

fn print_mustache(mustache: &MustacheStatement, out: &mut String) {
    let (open, close) = if mustache.trusting {
        ("{{{", "}}}")
    } else {
        ("{{", "}}")
    };

    out.push_str(open);
    print_call(&mustache.path, &mustache.params, &mustache.hash, out);
    out.push_str(close);
}

fn print_element(element: &ElementNode, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);

    for attr in element.attributes.iter() {
        out.push(' ');
        out.push_str(&attr.name);
        match attr.value {
            AttrValue::Text(ref text) if text.chars.is_empty() => {}
            AttrValue::Text(ref text) => {
                out.push_str("=\"");
                out.push_str(&text.chars);
                out.push('"');
            }
            AttrValue::Mustache(ref mustache) => {
                out.push('=');
                print_mustache(mustache, out);
            }
            AttrValue::Concat(ref parts) => {
                out.push_str("=\"");
                for part in parts.iter() {
                    match part {
                        ConcatPart::Text(text) => out.push_str(&text.chars),
                        ConcatPart::Mustache(mustache) => print_mustache(mustache, out),
                    }
                }
                out.push('"');
            }
        }
    }

    for modifier in element.modifiers.iter() {
        out.push_str(" {{");
        print_call(&modifier.path, &modifier.params, &modifier.hash, out);
        out.push_str("}}");
    }

    print_block_params(&element.block_params, out);

    if element.self_closing {
        out.push_str(" />");
        return;
    }

    out.push('>');
    if VOID_ELEMENTS.contains(&*element.tag) {
        return;
    }

    print_statements(&element.children, out);
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

fn print_call(path: &Expression, params: &[Expression], hash: &Hash, out: &mut String) {
    print_expression(path, out);
    for param in params.iter() {
        out.push(' ');
        print_expression(param, out);
    }
    for pair in hash.pairs.iter() {
        out.push(' ');
        out.push_str(&pair.key);
        out.push('=');
        print_expression(&pair.value, out);
    }
}

fn print_block_params(block_params: &BlockParams, out: &mut String) {
    if block_params.is_empty() {
        return;
    }

    out.push_str(" as |");
    for (idx, name) in block_params.iter().enumerate() {
        if idx != 0 {
            out.push(' ');
        }
        out.push_str(name);
    }
    out.push('|');
}

fn print_expression(expr: &Expression, out: &mut String) {
    match expr {
        Expression::Path(path) => out.push_str(&path.original()),
        Expression::SubExpression(sexpr) => {
            out.push('(');
            print_call(&sexpr.path, &sexpr.params, &sexpr.hash, out);
            out.push(')');
        }
        Expression::Literal(Literal::String(value)) => {
            out.push('"');
            out.push_str(&value.replace('"', "\\\""));
            out.push('"');
        }
        Expression::Literal(Literal::Number(number)) => out.push_str(&number.to_string()),
        Expression::Literal(Literal::Boolean(value)) => {
            out.push_str(if *value { "true" } else { "false" })
        }
        Expression::Literal(Literal::Null) => out.push_str("null"),
        Expression::Literal(Literal::Undefined) => out.push_str("undefined"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_template;

    fn roundtrip(input: &str) -> String {
        print_template(&parse_template(input).expect("template should parse"))
    }

    #[test]
    fn it_prints_what_it_parses() {
        for input in [
            "Hello, {{name}}!",
            r#"{{#let "twice" as |two|}}<Message @text={{two}} />{{/let}}"#,
            "{{#if a}}A{{else if b}}B{{else}}C{{/if}}",
            "{{#each @items as |item index|}}{{item}}{{else}}empty{{/each}}",
            r#"<div class="a {{b}}" disabled {{on "click" this.go}}>{{{html}}}</div>"#,
            "<input value={{this.value}}><br>",
            "{{format (now) 1 -2.5 locale=@locale}}",
            "<!-- html -->{{! short }}{{!-- long --}}",
            "&times; <this.message />",
        ] {
            assert_eq!(roundtrip(input), input);
        }
    }

    #[test]
    fn it_normalizes_quotes_and_self_closing() {
        assert_eq!(roundtrip("<bar/>"), "<bar />");
        assert_eq!(roundtrip("{{t 'hi'}}"), r#"{{t "hi"}}"#);
        assert_eq!(roundtrip(r#"{{t 'say "hi"'}}"#), r#"{{t "say \"hi\""}}"#);
    }
}
