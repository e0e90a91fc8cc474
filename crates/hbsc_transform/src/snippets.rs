//! Parsing of host code produced at transform time: expressions injected by
//! template plugins and compiled template artifacts.
//!
//! Every snippet gets its own source file in the unit's `SourceMap`, so the
//! positions of its nodes never overlap with the ones of the module.

use hbsc_core::JsUtilsError;
use swc_core::common::{sync::Lrc, FileName, SourceMap, Span, Spanned};
use swc_core::ecma::ast::{EsVersion, Expr, Ident, ModuleDecl, ModuleItem, Stmt};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};

/// Parses `source_text` as a module which must consist of exactly one expression statement
pub fn parse_injected_expression(
    cm: &Lrc<SourceMap>,
    source_text: &str,
    api: &'static str,
) -> Result<Box<Expr>, JsUtilsError> {
    let fm = cm.new_source_file(FileName::Anon.into(), source_text.to_owned());
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::EsNext,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let unparseable = || JsUtilsError::Unparseable {
        api,
        source_text: source_text.to_owned(),
    };

    let module = parser.parse_module().map_err(|_| unparseable())?;
    if !parser.take_errors().is_empty() {
        return Err(unparseable());
    }

    let found = module.body.len();
    let mut body = module.body.into_iter();
    match (body.next(), found) {
        (Some(ModuleItem::Stmt(Stmt::Expr(expr_stmt))), 1) => Ok(expr_stmt.expr),
        (Some(item), 1) => Err(JsUtilsError::NotAnExpression {
            api,
            found: item_kind(&item),
            source_text: source_text.to_owned(),
        }),
        _ => Err(JsUtilsError::NotSingleExpression {
            api,
            found,
            source_text: source_text.to_owned(),
        }),
    }
}

/// Parses the output of a template compiler.
/// Fails with the span of the whole output when it is not exactly one expression.
pub fn parse_compiled_artifact(cm: &Lrc<SourceMap>, compiled: &str) -> Result<Box<Expr>, Span> {
    let fm = cm.new_source_file(FileName::Anon.into(), compiled.to_owned());
    let file_span = Span::new(fm.start_pos, fm.end_pos);

    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::EsNext,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let expr = parser.parse_expr().map_err(|_| file_span)?;
    if !parser.take_errors().is_empty() {
        return Err(file_span);
    }

    // Anything after the expression means it was not a single one
    let expected_end = fm.start_pos + swc_core::common::BytePos(compiled.trim_end().len() as u32);
    if expr.span().hi != expected_end {
        return Err(file_span);
    }

    Ok(expr)
}

/// Wraps compiler output which is not an expression the parser understands.
/// It is printed back verbatim.
pub fn opaque_expression(compiled: &str, span: Span) -> Box<Expr> {
    Box::new(Expr::Ident(Ident::new_no_ctxt(compiled.into(), span)))
}

fn item_kind(item: &ModuleItem) -> &'static str {
    match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(_)) => "ImportDeclaration",
        ModuleItem::ModuleDecl(_) => "ExportDeclaration",
        ModuleItem::Stmt(Stmt::Decl(_)) => "VariableDeclaration",
        ModuleItem::Stmt(Stmt::Block(_)) => "BlockStatement",
        ModuleItem::Stmt(Stmt::Empty(_)) => "EmptyStatement",
        ModuleItem::Stmt(Stmt::Return(_)) => "ReturnStatement",
        ModuleItem::Stmt(Stmt::If(_)) => "IfStatement",
        ModuleItem::Stmt(_) => "Statement",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::to_str;

    #[test]
    fn it_parses_single_expressions() {
        let cm: Lrc<SourceMap> = Default::default();
        let expr = parse_injected_expression(&cm, "1 + 1", "bindExpression").unwrap();
        assert_eq!(to_str(&expr), "1+1");
    }

    #[test]
    fn it_rejects_bad_expressions() {
        let cm: Lrc<SourceMap> = Default::default();

        let err = parse_injected_expression(&cm, "1 +", "bindExpression").unwrap_err();
        assert_eq!(
            err.to_string(),
            "JSUtils.bindExpression could not understand the expression: 1 +"
        );

        let err = parse_injected_expression(&cm, "a; b", "emitExpression").unwrap_err();
        assert_eq!(
            err.to_string(),
            "JSUtils.emitExpression expected to find exactly one expression but found 2 in: a; b"
        );

        let err = parse_injected_expression(&cm, "let x = 1", "bindExpression").unwrap_err();
        assert!(matches!(err, JsUtilsError::NotAnExpression { found: "VariableDeclaration", .. }));
    }

    #[test]
    fn it_parses_compiled_artifacts() {
        let cm: Lrc<SourceMap> = Default::default();
        let expr = parse_compiled_artifact(&cm, "{\n  id: \"x\",\n  scope: () => [a]\n}\n").unwrap();
        assert!(matches!(*expr, Expr::Object(_)));

        assert!(parse_compiled_artifact(&cm, "not javascript at all {{").is_err());
        assert!(parse_compiled_artifact(&cm, "a b").is_err());
    }

    #[test]
    fn it_keeps_opaque_output_verbatim() {
        let expr = opaque_expression("@@compiled@@", swc_core::common::DUMMY_SP);
        assert_eq!(to_str(&expr), "@@compiled@@");
    }
}
