pub mod compiler;
pub mod parser;
pub mod plugins;

use hbsc_core::AstPlugin;
use swc_core::common::{
    comments::{Comments, SingleThreadedComments},
    sync::Lrc,
    FileName, SourceMap,
};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter, Node};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};

use self::{compiler::PrintingCompiler, parser::parse_javascript_module};
use crate::{transform_module, TransformError, TransformOptions};

pub fn to_str(swc_node: &impl Node) -> String {
    let cm: Lrc<SourceMap> = Default::default();

    // Emitting the result requires some setup with SWC
    let mut buff: Vec<u8> = Vec::with_capacity(128);
    let writer: JsWriter<&mut Vec<u8>> = JsWriter::new(cm.clone(), "\n", &mut buff, None);

    let mut emitter_cfg = swc_ecma_codegen::Config::default();
    emitter_cfg.minify = true;

    let mut emitter = Emitter {
        cfg: emitter_cfg,
        comments: None,
        wr: writer,
        cm,
    };

    let _ = swc_node.emit_with(&mut emitter);

    String::from_utf8(buff).unwrap()
}

/// Parses and prints `code` the way test outputs are printed
pub fn normalized(code: &str) -> String {
    to_str(&parse_javascript_module(code).unwrap())
}

/// Output of [`transform_js`]
pub struct Transformed {
    pub code: String,
    pub comments: SingleThreadedComments,
}

/// Runs the transform over `code` with [`PrintingCompiler`] and prints the result minified
pub fn transform_js(
    code: &str,
    options: &TransformOptions,
    mut transforms: Vec<Box<dyn AstPlugin>>,
) -> Result<Transformed, TransformError> {
    let cm: Lrc<SourceMap> = Default::default();
    let comments = SingleThreadedComments::default();

    let fm = cm.new_source_file(FileName::Anon.into(), code.to_owned());
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        Default::default(),
        StringInput::from(&*fm),
        Some(&comments as &dyn Comments),
    );
    let mut module = Parser::new_from(lexer).parse_module().unwrap();

    transform_module(
        &mut module,
        cm,
        Some(&comments as &dyn Comments),
        options,
        &PrintingCompiler,
        &mut transforms,
    )?;

    Ok(Transformed {
        code: to_str(&module),
        comments,
    })
}
