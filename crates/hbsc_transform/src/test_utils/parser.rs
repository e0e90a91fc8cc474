use swc_core::{common::BytePos, ecma::ast::{EsVersion, Module}};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};

pub fn parse_javascript_module(input: &str) -> Result<Module, swc_ecma_parser::error::Error> {
    // Position 0 is reserved for dummy spans
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::EsNext,
        StringInput::new(input, BytePos(1), BytePos(1 + input.len() as u32)),
        None,
    );

    let mut parser = Parser::new_from(lexer);

    parser.parse_module()
}
