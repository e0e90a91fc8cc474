use hbsc_core::{
    template::{builders, *},
    HbsAtom,
};
use phf::{phf_set, Set};

use crate::error::{ParseError, ParseErrorKind};

/// Elements which never have children nor a closing tag
pub static VOID_ELEMENTS: Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
};

/// Parses template text into a [`Template`].
pub fn parse_template(input: &str) -> Result<Template, ParseError> {
    let mut parser = TemplateParser { input, pos: 0 };
    let (body, stop) = parser.parse_statements()?;

    match stop {
        Stop::Eof => Ok(Template {
            body,
            block_params: BlockParams::new(),
        }),
        Stop::CloseTag => Err(parser.stray_close_tag()),
        Stop::Else => Err(parser.error(ParseErrorKind::UnexpectedBlockPart("{{else}}"))),
        Stop::CloseBlock => Err(parser.error(ParseErrorKind::UnexpectedBlockPart("{{/}}"))),
    }
}

/// Why a run of statements ended
enum Stop {
    Eof,
    /// At `</`
    CloseTag,
    /// At `{{else`
    Else,
    /// At `{{/`
    CloseBlock,
}

enum MustacheKind {
    Plain,
    Comment,
    Open,
    Close,
    Else,
}

/// Head of a mustache, block, modifier or sub-expression
struct Call {
    path: Expression,
    params: Vec<Expression>,
    hash: Hash,
    block_params: BlockParams,
}

struct TemplateParser<'s> {
    input: &'s str,
    pos: usize,
}

impl<'s> TemplateParser<'s> {
    fn parse_statements(&mut self) -> Result<(Vec<Statement>, Stop), ParseError> {
        let mut body = Vec::new();

        loop {
            if self.is_eof() {
                return Ok((body, Stop::Eof));
            }

            if self.at("{{") {
                match self.mustache_kind() {
                    MustacheKind::Comment => body.push(self.parse_mustache_comment()?),
                    MustacheKind::Open => body.push(self.parse_block()?),
                    MustacheKind::Close => return Ok((body, Stop::CloseBlock)),
                    MustacheKind::Else => return Ok((body, Stop::Else)),
                    MustacheKind::Plain => body.push(Statement::Mustache(self.parse_mustache()?)),
                }
            } else if self.at("<!--") {
                body.push(self.parse_html_comment()?);
            } else if self.at("</") {
                return Ok((body, Stop::CloseTag));
            } else if self.at_element_start() {
                body.push(Statement::Element(self.parse_element()?));
            } else {
                body.push(self.parse_text());
            }
        }
    }

    fn mustache_kind(&self) -> MustacheKind {
        let inner = &self.rest()[2..];
        let inner = inner.strip_prefix('~').unwrap_or(inner);

        if inner.starts_with('!') {
            MustacheKind::Comment
        } else if inner.starts_with('#') {
            MustacheKind::Open
        } else if inner.starts_with('/') {
            MustacheKind::Close
        } else if inner
            .strip_prefix("else")
            .is_some_and(|after| after.starts_with(|c: char| c.is_whitespace() || c == '}' || c == '~'))
        {
            MustacheKind::Else
        } else {
            MustacheKind::Plain
        }
    }

    fn parse_text(&mut self) -> Statement {
        let start = self.pos;
        while !self.is_eof() {
            if self.at("{{") || self.at("<!--") || self.at("</") || self.at_element_start() {
                break;
            }
            self.bump();
        }

        builders::text(&self.input[start..self.pos])
    }

    fn parse_html_comment(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.expect("<!--")?;

        let Some(len) = self.rest().find("-->") else {
            return Err(ParseError::new(ParseErrorKind::Expected("-->"), start, self.input.len()));
        };

        let value = self.rest()[..len].to_owned();
        self.pos += len + "-->".len();
        Ok(Statement::Comment(CommentStatement { value }))
    }

    /// `{{! short }}` or `{{!-- long --}}`.
    /// The stored value is everything between `!` and the closing `}}`.
    fn parse_mustache_comment(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.expect("{{")?;
        self.eat("~");
        self.expect("!")?;

        let rest = self.rest();
        let value_len = if rest.starts_with("--") {
            let long_end = [rest.find("--}}"), rest.find("--~}}")]
                .into_iter()
                .flatten()
                .min();
            long_end.map(|idx| if rest[idx..].starts_with("--~") { idx + 3 } else { idx + 2 })
        } else {
            rest.find("}}")
        };

        let Some(value_len) = value_len else {
            return Err(ParseError::new(ParseErrorKind::Expected("}}"), start, self.input.len()));
        };

        let value = rest[..value_len].to_owned();
        self.pos += value_len + "}}".len();
        Ok(Statement::MustacheComment(CommentStatement { value }))
    }

    fn parse_mustache(&mut self) -> Result<MustacheStatement, ParseError> {
        let start = self.pos;
        self.expect("{{")?;
        let trusting = self.eat("{");
        self.eat("~");

        let call = self.parse_call(if trusting { "}}}" } else { "}}" })?;
        if !call.block_params.is_empty() {
            return Err(ParseError::new(ParseErrorKind::InvalidBlockParams, start, self.pos));
        }

        Ok(MustacheStatement {
            path: call.path,
            params: call.params,
            hash: call.hash,
            trusting,
        })
    }

    fn parse_block(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.expect("{{")?;
        self.eat("~");
        self.expect("#")?;

        let call = self.parse_call("}}")?;
        let name = match call.path {
            Expression::Path(ref path) => path.original(),
            _ => return Err(ParseError::new(ParseErrorKind::ExpectedExpression, start, self.pos)),
        };

        let (program, inverse) = self.parse_block_contents(call.block_params, &name)?;

        // `{{/name}}`
        let close_start = self.pos;
        self.expect("{{")?;
        self.eat("~");
        self.expect("/")?;
        self.skip_ws();
        let found = self.read_word();
        if found != name {
            return Err(ParseError::new(
                ParseErrorKind::MismatchedCloseBlock {
                    expected: name,
                    found: found.to_owned(),
                },
                close_start,
                self.pos,
            ));
        }
        self.skip_ws();
        self.eat("~");
        self.expect("}}")?;

        Ok(Statement::Block(BlockStatement {
            path: call.path,
            params: call.params,
            hash: call.hash,
            program,
            inverse,
        }))
    }

    /// Parses the program and the inverse of a block, stopping before `{{/`
    fn parse_block_contents(
        &mut self,
        block_params: BlockParams,
        name: &str,
    ) -> Result<(Block, Option<Block>), ParseError> {
        let (body, stop) = self.parse_statements()?;
        let program = Block {
            body,
            block_params,
            chained: false,
        };

        match stop {
            Stop::CloseBlock => Ok((program, None)),
            Stop::Else => {
                let inverse = self.parse_inverse(name)?;
                Ok((program, Some(inverse)))
            }
            Stop::Eof => Err(self.error(ParseErrorKind::UnclosedBlock(name.to_owned()))),
            Stop::CloseTag => Err(self.stray_close_tag()),
        }
    }

    /// `{{else}}...` or the chained `{{else if cond}}...`
    fn parse_inverse(&mut self, name: &str) -> Result<Block, ParseError> {
        self.expect("{{")?;
        self.eat("~");
        self.expect("else")?;
        self.skip_ws();

        if self.at_closer("}}") {
            self.eat("~");
            self.expect("}}")?;

            let (body, stop) = self.parse_statements()?;
            return match stop {
                Stop::CloseBlock => Ok(Block {
                    body,
                    block_params: BlockParams::new(),
                    chained: false,
                }),
                Stop::Else => Err(self.error(ParseErrorKind::UnexpectedBlockPart("{{else}}"))),
                Stop::Eof => Err(self.error(ParseErrorKind::UnclosedBlock(name.to_owned()))),
                Stop::CloseTag => Err(self.stray_close_tag()),
            };
        }

        let call = self.parse_call("}}")?;
        let (program, inverse) = self.parse_block_contents(call.block_params, name)?;

        Ok(Block {
            body: vec![Statement::Block(BlockStatement {
                path: call.path,
                params: call.params,
                hash: call.hash,
                program,
                inverse,
            })],
            block_params: BlockParams::new(),
            chained: true,
        })
    }

    fn parse_element(&mut self) -> Result<ElementNode, ParseError> {
        let start = self.pos;
        self.expect("<")?;
        let tag = self.read_tag_name();

        let mut element = builders::element(tag);
        element.self_closing = false;

        loop {
            self.skip_ws();

            if self.eat("/>") {
                element.self_closing = true;
                return Ok(element);
            }
            if self.eat(">") {
                break;
            }
            if self.is_eof() {
                return Err(ParseError::new(
                    ParseErrorKind::UnclosedElement(tag.to_owned()),
                    start,
                    self.pos,
                ));
            }

            if self.eat("{{") {
                self.eat("~");
                let call = self.parse_call("}}")?;
                element.modifiers.push(ElementModifierStatement {
                    path: call.path,
                    params: call.params,
                    hash: call.hash,
                });
            } else if self.at_block_params() {
                element.block_params = self.parse_block_params()?;
            } else {
                element.attributes.push(self.parse_attribute()?);
            }
        }

        if VOID_ELEMENTS.contains(tag) {
            return Ok(element);
        }

        let (children, stop) = self.parse_statements()?;
        element.children = children;

        match stop {
            Stop::CloseTag => {
                let close_start = self.pos;
                self.expect("</")?;
                let found = self.read_tag_name();
                if found != tag {
                    return Err(ParseError::new(
                        ParseErrorKind::MismatchedCloseTag {
                            expected: tag.to_owned(),
                            found: found.to_owned(),
                        },
                        close_start,
                        self.pos,
                    ));
                }
                self.skip_ws();
                self.expect(">")?;
                Ok(element)
            }
            Stop::Else => Err(self.error(ParseErrorKind::UnexpectedBlockPart("{{else}}"))),
            Stop::Eof | Stop::CloseBlock => Err(ParseError::new(
                ParseErrorKind::UnclosedElement(tag.to_owned()),
                start,
                self.pos,
            )),
        }
    }

    fn parse_attribute(&mut self) -> Result<AttrNode, ParseError> {
        let start = self.pos;
        while !self.is_eof() {
            if self.at("=") || self.at(">") || self.at("/>") || self.at_whitespace() {
                break;
            }
            self.bump();
        }

        let name = &self.input[start..self.pos];
        if name.is_empty() {
            return Err(self.error(ParseErrorKind::Expected("attribute name")));
        }

        if !self.eat("=") {
            return Ok(builders::attr(
                name,
                AttrValue::Text(TextNode {
                    chars: String::new(),
                }),
            ));
        }

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => self.parse_quoted_attr_value(quote)?,
            Some('{') if self.at("{{") => AttrValue::Mustache(self.parse_mustache()?),
            _ => {
                let value_start = self.pos;
                while !self.is_eof() && !self.at(">") && !self.at("/>") && !self.at_whitespace() {
                    self.bump();
                }
                AttrValue::Text(TextNode {
                    chars: self.input[value_start..self.pos].to_owned(),
                })
            }
        };

        Ok(builders::attr(name, value))
    }

    fn parse_quoted_attr_value(&mut self, quote: char) -> Result<AttrValue, ParseError> {
        let start = self.pos;
        self.bump();

        let mut parts = Vec::<ConcatPart>::new();
        let mut text_start = self.pos;

        loop {
            if self.is_eof() {
                return Err(ParseError::new(ParseErrorKind::UnterminatedString, start, self.pos));
            }

            if self.peek() == Some(quote) || self.at("{{") {
                if self.pos > text_start {
                    parts.push(ConcatPart::Text(TextNode {
                        chars: self.input[text_start..self.pos].to_owned(),
                    }));
                }
                if self.peek() == Some(quote) {
                    self.bump();
                    break;
                }
                parts.push(ConcatPart::Mustache(self.parse_mustache()?));
                text_start = self.pos;
                continue;
            }

            self.bump();
        }

        let has_mustache = parts.iter().any(|it| matches!(it, ConcatPart::Mustache(_)));
        if has_mustache {
            return Ok(AttrValue::Concat(parts));
        }

        let chars = match parts.pop() {
            Some(ConcatPart::Text(text)) => text.chars,
            _ => String::new(),
        };
        Ok(AttrValue::Text(TextNode { chars }))
    }

    /// Parses `path params key=value as |a b|` up to and including `closer`
    fn parse_call(&mut self, closer: &'static str) -> Result<Call, ParseError> {
        let path = self.parse_expression()?;
        let mut params = Vec::new();
        let mut hash = Hash::default();
        let mut block_params = BlockParams::new();

        loop {
            self.skip_ws();

            if self.at_closer(closer) {
                self.eat("~");
                self.expect(closer)?;
                break;
            }
            if self.is_eof() {
                return Err(self.error(ParseErrorKind::UnexpectedEof));
            }

            if self.at_block_params() {
                block_params = self.parse_block_params()?;
            } else if let Some(key) = self.peek_hash_key() {
                self.pos += key.len() + "=".len();
                let value = self.parse_expression()?;
                hash.pairs.push(HashPair {
                    key: HbsAtom::from(key),
                    value,
                });
            } else {
                params.push(self.parse_expression()?);
            }
        }

        Ok(Call {
            path,
            params,
            hash,
            block_params,
        })
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.skip_ws();
        let start = self.pos;

        match self.peek() {
            None => Err(self.error(ParseErrorKind::UnexpectedEof)),

            Some('(') => {
                self.bump();
                let call = self.parse_call(")")?;
                if !call.block_params.is_empty() {
                    return Err(ParseError::new(ParseErrorKind::InvalidBlockParams, start, self.pos));
                }
                Ok(builders::sexpr(call.path, call.params, call.hash))
            }

            Some(quote @ ('"' | '\'')) => self.parse_string(quote),

            Some(_) => {
                let word = self.read_word();
                if word.is_empty() {
                    return Err(ParseError::new(ParseErrorKind::ExpectedExpression, start, start));
                }

                let expr = match word {
                    "true" => builders::boolean(true),
                    "false" => builders::boolean(false),
                    "null" => Expression::Literal(Literal::Null),
                    "undefined" => Expression::Literal(Literal::Undefined),
                    _ if is_numeric(word) => match word.parse::<f64>() {
                        Ok(number) => builders::number(number),
                        Err(_) => {
                            return Err(ParseError::new(
                                ParseErrorKind::ExpectedExpression,
                                start,
                                self.pos,
                            ))
                        }
                    },
                    _ => Expression::Path(builders::path_expression(word)),
                };

                Ok(expr)
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<Expression, ParseError> {
        let start = self.pos;
        self.bump();

        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::new(ParseErrorKind::UnterminatedString, start, self.pos))
                }
                Some('\\') if self.rest()[1..].starts_with(quote) => {
                    value.push(quote);
                    self.pos += 1 + quote.len_utf8();
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }

        Ok(Expression::Literal(Literal::String(value)))
    }

    fn parse_block_params(&mut self) -> Result<BlockParams, ParseError> {
        let start = self.pos;
        self.expect("as")?;
        self.skip_ws();
        self.expect("|")?;

        let mut names = BlockParams::new();
        loop {
            self.skip_ws();
            if self.eat("|") {
                break;
            }
            if self.is_eof() {
                return Err(ParseError::new(ParseErrorKind::InvalidBlockParams, start, self.pos));
            }

            let name_start = self.pos;
            while !self.is_eof() && !self.at("|") && !self.at_whitespace() {
                self.bump();
            }
            names.push(HbsAtom::from(&self.input[name_start..self.pos]));
        }

        if names.is_empty() {
            return Err(ParseError::new(ParseErrorKind::InvalidBlockParams, start, self.pos));
        }
        Ok(names)
    }

    fn peek_hash_key(&self) -> Option<&'s str> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '$' | '@')))
            .unwrap_or(rest.len());

        if len > 0 && rest[len..].starts_with('=') {
            Some(&rest[..len])
        } else {
            None
        }
    }

    /// Reads a path or a literal word
    fn read_word(&mut self) -> &'s str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '(' | ')' | '{' | '}' | '|' | '=' | '"' | '\'') {
                break;
            }
            if c == '~' && self.rest()[1..].starts_with('}') {
                break;
            }
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn read_tag_name(&mut self) -> &'s str {
        let start = self.pos;
        while !self.is_eof() && !self.at(">") && !self.at("/>") && !self.at_whitespace() {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn stray_close_tag(&mut self) -> ParseError {
        let start = self.pos;
        self.eat("</");
        let tag = self.read_tag_name().to_owned();
        ParseError::new(ParseErrorKind::UnexpectedCloseTag(tag), start, self.pos)
    }

    fn at_element_start(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some('<')
            && chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '@' || c == ':')
    }

    fn at_block_params(&self) -> bool {
        self.rest()
            .strip_prefix("as")
            .is_some_and(|after| {
                (after.starts_with('|') || after.starts_with(char::is_whitespace))
                    && after.trim_start().starts_with('|')
            })
    }

    fn at_closer(&self, closer: &str) -> bool {
        self.at(closer) || (self.at("~") && self.rest()[1..].starts_with(closer))
    }

    #[inline]
    fn rest(&self) -> &'s str {
        &self.input[self.pos..]
    }

    #[inline]
    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    fn at(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    #[inline]
    fn at_whitespace(&self) -> bool {
        self.rest().starts_with(char::is_whitespace)
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    #[inline]
    fn bump(&mut self) {
        self.pos += self.peek().map_or(1, char::len_utf8);
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.at(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, s: &'static str) -> Result<(), ParseError> {
        if self.eat(s) {
            Ok(())
        } else if self.is_eof() {
            Err(self.error(ParseErrorKind::UnexpectedEof))
        } else {
            Err(self.error(ParseErrorKind::Expected(s)))
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.pos, self.pos)
    }
}

/// `Infinity` and `NaN` are paths, not numbers
fn is_numeric(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    digits.starts_with(|c: char| c.is_ascii_digit())
}
