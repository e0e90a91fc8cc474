//! The main public crate of the `hbsc` project.
//!
//! Compiles the inline templates of a JavaScript or TypeScript module:
//!
//! ```
//! use hbsc::{compile, HbscOptions};
//! use hbsc_syntax::GlimmerCompiler;
//!
//! let source = r#"
//!   import { precompileTemplate } from '@ember/template-compilation';
//!   export default precompileTemplate('<h1>hello</h1>');
//! "#;
//!
//! let options = HbscOptions::default();
//! let compiled = compile(source, &options, &GlimmerCompiler, vec![]).unwrap();
//! assert!(compiled.contains("createTemplateFactory"));
//! ```

pub mod error;

use serde::Deserialize;
use swc_core::{
    common::{
        comments::{Comments, SingleThreadedComments},
        sync::Lrc,
        FileName, SourceMap,
    },
    ecma::ast::{EsVersion, Module},
};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter, Node};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
use tracing::debug;

pub use error::CompileError;
pub use hbsc_core::*;
pub use hbsc_transform::{transform_module, TransformError, TransformOptions};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HbscOptions {
    #[serde(flatten)]
    pub transform: TransformOptions,
    /// Print the output without whitespace
    pub minify: bool,
}

/// Parses `source`, compiles its template sites and prints the result.
///
/// The syntax is picked from the extension of `options.transform.filename`.
pub fn compile(
    source: &str,
    options: &HbscOptions,
    compiler: &dyn TemplateCompiler,
    mut transforms: Vec<Box<dyn AstPlugin>>,
) -> Result<String, CompileError> {
    let filename = &options.transform.filename;
    let cm: Lrc<SourceMap> = Default::default();
    let comments = SingleThreadedComments::default();
    let fm = cm.new_source_file(FileName::Custom(filename.clone()).into(), source.to_owned());

    let lexer = Lexer::new(
        syntax_for(filename),
        EsVersion::EsNext,
        StringInput::from(&*fm),
        Some(&comments as &dyn Comments),
    );
    let mut parser = Parser::new_from(lexer);
    let mut module = parser.parse_module()?;
    if let Some(error) = parser.take_errors().into_iter().next() {
        return Err(error.into());
    }

    transform_module(
        &mut module,
        cm.clone(),
        Some(&comments as &dyn Comments),
        &options.transform,
        compiler,
        &mut transforms,
    )?;

    debug!(filename = filename.as_str(), "Compiled module");
    stringify(&module, cm, &comments, options.minify)
}

fn syntax_for(filename: &str) -> Syntax {
    let is_typescript = [".ts", ".mts", ".gts"]
        .iter()
        .any(|extension| filename.ends_with(extension));

    if is_typescript {
        Syntax::Typescript(TsSyntax {
            decorators: true,
            ..Default::default()
        })
    } else {
        Syntax::Es(EsSyntax {
            decorators: true,
            ..Default::default()
        })
    }
}

fn stringify(
    module: &Module,
    cm: Lrc<SourceMap>,
    comments: &SingleThreadedComments,
    minify: bool,
) -> Result<String, CompileError> {
    // Emitting the result requires some setup with SWC
    let mut buff: Vec<u8> = Vec::new();
    let writer: JsWriter<&mut Vec<u8>> = JsWriter::new(cm.clone(), "\n", &mut buff, None);

    let mut emitter_cfg = swc_ecma_codegen::Config::default();
    emitter_cfg.minify = minify;

    let mut emitter = Emitter {
        cfg: emitter_cfg,
        comments: Some(comments as &dyn Comments),
        wr: writer,
        cm,
    };
    module.emit_with(&mut emitter)?;

    String::from_utf8(buff)
        .map_err(|e| CompileError::Emit(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_picks_syntax_from_the_extension() {
        assert!(matches!(syntax_for("app/components/card.gts"), Syntax::Typescript(_)));
        assert!(matches!(syntax_for("app/components/card.mts"), Syntax::Typescript(_)));
        assert!(matches!(syntax_for("app/components/card.gjs"), Syntax::Es(_)));
        assert!(matches!(syntax_for(""), Syntax::Es(_)));
    }

    #[test]
    fn it_reads_camel_case_options() {
        let options: HbscOptions = serde_json::from_str(
            r#"{ "targetFormat": "hbs", "filename": "foo.ts", "minify": true }"#,
        )
        .unwrap();
        assert_eq!(options.transform.target_format, TargetFormat::Hbs);
        assert_eq!(options.transform.filename, "foo.ts");
        assert!(options.minify);
    }
}
