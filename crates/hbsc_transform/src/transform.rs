//! Finds template sites while walking the host module and replaces them
//! with their compiled (`wire`) or rewritten (`hbs`) form.
//!
//! The walk is post-order: a site is handled once its children were, and a
//! replacement is never visited again.

use std::{cell::RefCell, rc::Rc};

use hbsc_core::{
    AstPlugin, CompileMode, CompileOptions, CompilerError, HbsAtom, TargetFormat,
    TemplateCompiler,
};
use swc_core::{
    common::{Span, Spanned, DUMMY_SP},
    ecma::{
        ast::*,
        visit::{VisitMut, VisitMutWith},
    },
};
use tracing::{debug, warn};

use crate::{
    atoms::*,
    context::ModuleContext,
    crawl::ScopeCrawler,
    emit::{
        add_template_comment, call, is_prop_named, prop_name, reference_locals, remap_scope,
        runtime_error, scope_prop, set_quasi_text, set_scope_prop, static_text, string,
        tpl_text, unwrap_parens_mut,
    },
    error::{TemplateSiteError, TemplateSiteErrorKind, TransformError},
    host_scope::*,
    js_utils::SiteJsUtils,
    modules::{Capability, TemplateModule},
    options_parser::{parse_static_options, unwrap_parens, StaticOptions},
    scope_locals::ScopeLocals,
    snippets::{opaque_expression, parse_compiled_artifact},
    TransformOptions,
};

type SiteResult = Result<Option<Box<Expr>>, TransformError>;

/// A recognized template site
struct Site {
    module: TemplateModule,
    /// Local name of the callee or tag
    invoked: HbsAtom,
    span: Span,
    template: String,
    options: StaticOptions,
}

impl Site {
    fn is_rfc931(&self) -> bool {
        self.module.capabilities().contains(Capability::Rfc931)
    }
}

pub struct TemplateTransformVisitor<'a, 'c> {
    ctx: ModuleContext<'c>,
    options: &'a TransformOptions,
    compiler: &'a dyn TemplateCompiler,
    transforms: &'a mut [Box<dyn AstPlugin>],
    error: Option<TransformError>,
}

impl<'a, 'c> TemplateTransformVisitor<'a, 'c> {
    pub fn new(
        ctx: ModuleContext<'c>,
        options: &'a TransformOptions,
        compiler: &'a dyn TemplateCompiler,
        transforms: &'a mut [Box<dyn AstPlugin>],
    ) -> Self {
        TemplateTransformVisitor {
            ctx,
            options,
            compiler,
            transforms,
            error: None,
        }
    }

    /// The module state after the walk, or the first error
    pub fn finish(self) -> Result<ModuleContext<'c>, TransformError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.ctx),
        }
    }

    fn with_frame(&mut self, names: Vec<HbsAtom>, f: impl FnOnce(&mut Self)) {
        self.ctx.scope.push_frame(names);
        f(self);
        self.ctx.scope.pop_frame();
    }

    fn with_this(&mut self, may_use_lexical_this: bool, f: impl FnOnce(&mut Self)) {
        self.ctx.scope.push_this(may_use_lexical_this);
        f(self);
        self.ctx.scope.pop_this();
    }

    fn template_module(&self, local: &str) -> Option<TemplateModule> {
        let (source, imported) = self.ctx.scope.resolve_import(local)?;
        TemplateModule::lookup(source, imported, &self.options.enable_legacy_modules)
    }

    fn call_site(&mut self, call_expr: &mut CallExpr) -> SiteResult {
        let Callee::Expr(ref callee) = call_expr.callee else {
            return Ok(None);
        };
        let Expr::Ident(ref callee) = **callee else {
            return Ok(None);
        };
        let Some(module) = self.template_module(&callee.sym) else {
            return Ok(None);
        };
        let invoked = callee.sym.clone();

        debug!(
            module = module.specifier(),
            export = module.export(),
            target = %self.options.target_format,
            "Recognized template call"
        );

        let site = Site {
            module,
            template: call_template(call_expr, &invoked)?,
            options: call_options(call_expr, &invoked, module)?,
            invoked,
            span: call_expr.span,
        };

        match self.options.target_format {
            TargetFormat::Wire => self.wire_site(site).map(Some),
            TargetFormat::Hbs => self.hbs_call_site(site, call_expr),
        }
    }

    fn tagged_site(&mut self, tagged: &mut TaggedTpl) -> SiteResult {
        let Expr::Ident(ref tag) = *tagged.tag else {
            return Ok(None);
        };
        let Some(module) = self.template_module(&tag.sym) else {
            return Ok(None);
        };
        let invoked = tag.sym.clone();

        debug!(
            module = module.specifier(),
            export = module.export(),
            target = %self.options.target_format,
            "Recognized template tag"
        );

        if !module.capabilities().contains(Capability::TemplateLiteral) {
            return Err(TemplateSiteError::new(
                tagged.span,
                TemplateSiteErrorKind::TemplateTagNotAllowed(invoked.to_string()),
            )
            .into());
        }
        if !tagged.tpl.exprs.is_empty() {
            return Err(TemplateSiteError::new(
                tagged.tpl.span,
                TemplateSiteErrorKind::TaggedTemplatePlaceholders,
            )
            .into());
        }

        let site = Site {
            module,
            invoked,
            span: tagged.span,
            template: tpl_text(&tagged.tpl),
            options: StaticOptions::default(),
        };

        match self.options.target_format {
            TargetFormat::Wire => self.wire_site(site).map(Some),
            TargetFormat::Hbs => self.hbs_tagged_site(site, tagged),
        }
    }

    /// `createTemplateFactory(/* template */ <compiled>)`
    fn wire_site(&mut self, mut site: Site) -> Result<Box<Expr>, TransformError> {
        let runtime_errors = insert_runtime_errors(&site)?;
        let declared = declared_names(&site.options);

        let locals = Rc::new(RefCell::new(self.site_locals(&mut site.options)));
        let compiled = self.run_compiler(
            &site,
            &locals,
            CompileMode::Precompile,
            true,
            |compiler, options| {
                let contents = options.contents;
                compiler.precompile(contents, options)
            },
        );
        let locals = locals.replace(ScopeLocals::explicit());

        // The whole site goes away, only the compiled scope refers to host names
        self.ctx.imports.remove_reference(&site.invoked);
        self.release_scope(&declared);

        let source = match compiled {
            Ok(source) => source,
            Err(error) if runtime_errors => {
                warn!(%error, "Deferring template compilation error to runtime");
                return Ok(runtime_error(&error.message()));
            }
            Err(error) => return Err(TransformError::from_compiler(error, site.span)),
        };
        debug!(locals = locals.len(), mode = ?locals.mode(), "Compiled template site");

        let mut compiled = match parse_compiled_artifact(&self.ctx.cm, &source) {
            Ok(compiled) => compiled,
            Err(span) => {
                warn!("Compiled template is not an expression, emitting it verbatim");
                opaque_expression(&source, span)
            }
        };

        if locals.needs_remapping() {
            remap_scope(&mut compiled, &locals, &self.ctx.scope, &mut self.ctx.imports);
        } else {
            reference_locals(&locals, &self.ctx.scope, &mut self.ctx.imports);
        }

        if let Some(comments) = self.ctx.comments {
            add_template_comment(comments, &compiled, &site.template);
        }

        let factory = self.import_runtime(
            &TEMPLATE_FACTORY_MODULE,
            &CREATE_TEMPLATE_FACTORY,
            &CREATE_TEMPLATE_FACTORY,
        );
        let factory_call = call(factory, vec![compiled]);

        if site.is_rfc931() {
            Ok(self.set_component_template(factory_call, site.options.component.take()))
        } else {
            Ok(factory_call)
        }
    }

    fn hbs_call_site(&mut self, mut site: Site, call_expr: &mut CallExpr) -> SiteResult {
        insert_runtime_errors(&site)?;
        let declared = declared_names(&site.options);
        let (locals, printed, unchanged) = self.preprocess_site(&mut site)?;

        // The scope gets rewritten from the final locals
        self.release_scope(&declared);

        if site.is_rfc931() {
            self.ctx.imports.remove_reference(&site.invoked);
            return Ok(Some(self.hbs_rfc931(site, call_expr, &locals, &printed, unchanged)));
        }

        if !unchanged {
            if let Some(first) = call_expr.args.first_mut() {
                first.expr = string(&printed);
            }
        }

        if !locals.is_empty() && !site.module.capabilities().contains(Capability::Scope) {
            self.ctx.imports.remove_reference(&site.invoked);
            let precompile = self.import_runtime(
                &TEMPLATE_COMPILATION_MODULE,
                &PRECOMPILE_TEMPLATE,
                &PRECOMPILE_TEMPLATE,
            );
            call_expr.callee = Callee::Expr(Box::new(Expr::Ident(precompile)));
        }

        match call_expr.args.get_mut(1) {
            Some(arg) => {
                if let Expr::Object(options) = unwrap_parens_mut(&mut arg.expr) {
                    set_scope_prop(options, &locals);
                }
            }
            None if !locals.is_empty() => call_expr.args.push(ExprOrSpread {
                spread: None,
                expr: Box::new(Expr::Object(ObjectLit {
                    span: DUMMY_SP,
                    props: vec![scope_prop(&locals)],
                })),
            }),
            None => {}
        }

        reference_locals(&locals, &self.ctx.scope, &mut self.ctx.imports);
        Ok(None)
    }

    fn hbs_tagged_site(&mut self, mut site: Site, tagged: &mut TaggedTpl) -> SiteResult {
        let (locals, printed, unchanged) = self.preprocess_site(&mut site)?;

        if locals.is_empty() {
            if !unchanged {
                set_quasi_text(&mut tagged.tpl, &printed);
            }
            return Ok(None);
        }

        // A tag cannot pass a scope, the site becomes a call
        self.ctx.imports.remove_reference(&site.invoked);
        let precompile = self.import_runtime(
            &TEMPLATE_COMPILATION_MODULE,
            &PRECOMPILE_TEMPLATE,
            &PRECOMPILE_TEMPLATE,
        );
        let options = ObjectLit {
            span: DUMMY_SP,
            props: vec![scope_prop(&locals)],
        };
        reference_locals(&locals, &self.ctx.scope, &mut self.ctx.imports);

        Ok(Some(call(
            precompile,
            vec![string(&printed), Box::new(Expr::Object(options))],
        )))
    }

    /// `setComponentTemplate(precompileTemplate(<text>, <options>), <component>)`
    fn hbs_rfc931(
        &mut self,
        site: Site,
        call_expr: &CallExpr,
        locals: &ScopeLocals,
        printed: &str,
        unchanged: bool,
    ) -> Box<Expr> {
        let text = match call_expr.args.first() {
            Some(first) if unchanged => first.expr.clone(),
            _ => string(printed),
        };
        let user_options = call_expr
            .args
            .get(1)
            .and_then(|arg| match unwrap_parens(&arg.expr) {
                Expr::Object(options) => Some(options),
                _ => None,
            });
        let options = rfc931_options(user_options, locals);

        let precompile = self.import_runtime(
            &TEMPLATE_COMPILATION_MODULE,
            &PRECOMPILE_TEMPLATE,
            &PRECOMPILE_TEMPLATE,
        );
        reference_locals(locals, &self.ctx.scope, &mut self.ctx.imports);

        let template = call(precompile, vec![text, Box::new(Expr::Object(options))]);
        self.set_component_template(template, site.options.component)
    }

    fn set_component_template(
        &mut self,
        template: Box<Expr>,
        component: Option<Box<Expr>>,
    ) -> Box<Expr> {
        let setter = self.import_runtime(
            &COMPONENT_MODULE,
            &SET_COMPONENT_TEMPLATE,
            &SET_COMPONENT_TEMPLATE,
        );

        let component = match component {
            Some(component) => component,
            None => {
                let template_only = self.import_runtime(&TEMPLATE_ONLY_MODULE, &DEFAULT, "templateOnly");
                call(template_only, vec![])
            }
        };

        call(setter, vec![template, component])
    }

    /// Runs the compiler in codemod mode.
    /// Returns the locals, the printed template and whether printing is all that changed it.
    fn preprocess_site(
        &mut self,
        site: &mut Site,
    ) -> Result<(ScopeLocals, String, bool), TransformError> {
        let baseline = Rc::new(RefCell::new(ScopeLocals::explicit()));
        let untouched = self
            .run_compiler(site, &baseline, CompileMode::Codemod, false, print_preprocessed)
            .map_err(|error| TransformError::from_compiler(error, site.span))?;

        let locals = Rc::new(RefCell::new(self.site_locals(&mut site.options)));
        let printed = self
            .run_compiler(site, &locals, CompileMode::Codemod, true, print_preprocessed)
            .map_err(|error| TransformError::from_compiler(error, site.span))?;
        let locals = locals.replace(ScopeLocals::explicit());

        debug!(locals = locals.len(), mode = ?locals.mode(), "Preprocessed template site");

        let unchanged = printed == untouched;
        Ok((locals, printed, unchanged))
    }

    /// Hands the site to the compiler with the user transforms followed by the crawler
    fn run_compiler<T>(
        &mut self,
        site: &Site,
        locals: &Rc<RefCell<ScopeLocals>>,
        mode: CompileMode,
        with_plugins: bool,
        run: impl FnOnce(&dyn TemplateCompiler, &mut CompileOptions<'_>) -> Result<T, CompilerError>,
    ) -> Result<T, CompilerError> {
        let strict_mode = if site.is_rfc931() {
            site.options.flag(&STRICT).unwrap_or(true)
        } else {
            site.options.flag(&STRICT_MODE).unwrap_or(false)
        };
        let module_name = site
            .options
            .string(&MODULE_NAME)
            .map(str::to_owned)
            .or_else(|| self.options.module_name.clone())
            .unwrap_or_else(|| self.options.filename.clone());

        let mut crawler = ScopeCrawler::new(locals.clone());
        let mut jsutils = SiteJsUtils::new(locals.clone(), &mut self.ctx);

        let mut plugins: Vec<&mut dyn AstPlugin> = Vec::with_capacity(self.transforms.len() + 1);
        if with_plugins {
            for transform in self.transforms.iter_mut() {
                plugins.push(transform.as_mut());
            }
            plugins.push(&mut crawler);
        }

        let mut options = CompileOptions {
            contents: &site.template,
            module_name: &module_name,
            filename: &self.options.filename,
            strict_mode,
            mode,
            user_options: &site.options.passthrough,
            plugins,
            jsutils: &mut jsutils,
        };

        run(self.compiler, &mut options)
    }

    /// The ledger the site starts with
    fn site_locals(&self, options: &mut StaticOptions) -> ScopeLocals {
        let declared = options.scope.take();
        if !options.has_eval {
            return declared.unwrap_or_else(ScopeLocals::explicit);
        }

        let mut locals = ScopeLocals::implicit(self.ctx.scope.may_use_lexical_this());
        for (hbs_name, js_name) in declared.iter().flat_map(|scope| scope.entries()) {
            locals.add(hbs_name.clone(), Some(js_name.clone()));
        }
        locals
    }

    /// Records that the declared scope values left the output
    fn release_scope(&mut self, declared: &[HbsAtom]) {
        for js_name in declared.iter() {
            self.ctx.imports.release_in(&self.ctx.scope, js_name);
        }
    }

    fn import_runtime(&mut self, source: &str, imported: &str, name_hint: &str) -> Ident {
        self.ctx.import_runtime(
            &self.options.output_module_overrides,
            source,
            imported,
            name_hint,
        )
    }
}

impl VisitMut for TemplateTransformVisitor<'_, '_> {
    fn visit_mut_expr(&mut self, n: &mut Expr) {
        if self.error.is_some() {
            return;
        }
        n.visit_mut_children_with(self);
        if self.error.is_some() {
            return;
        }

        let result = match n {
            Expr::Call(call_expr) => self.call_site(call_expr),
            Expr::TaggedTpl(tagged) => self.tagged_site(tagged),
            _ => Ok(None),
        };

        match result {
            Ok(Some(replacement)) => *n = *replacement,
            Ok(None) => {}
            Err(error) => self.error = Some(error),
        }
    }

    fn visit_mut_function(&mut self, n: &mut Function) {
        self.with_frame(function_bindings(n), |this| {
            this.with_this(true, |this| n.visit_mut_children_with(this))
        });
    }

    fn visit_mut_arrow_expr(&mut self, n: &mut ArrowExpr) {
        self.with_frame(arrow_bindings(n), |this| n.visit_mut_children_with(this));
    }

    fn visit_mut_constructor(&mut self, n: &mut Constructor) {
        self.with_frame(constructor_bindings(n), |this| {
            this.with_this(true, |this| n.visit_mut_children_with(this))
        });
    }

    fn visit_mut_block_stmt(&mut self, n: &mut BlockStmt) {
        self.with_frame(block_bindings(&n.stmts), |this| {
            n.visit_mut_children_with(this)
        });
    }

    fn visit_mut_for_stmt(&mut self, n: &mut ForStmt) {
        let head = match n.init {
            Some(VarDeclOrExpr::VarDecl(ref var_decl)) => Some(&**var_decl),
            _ => None,
        };
        let names = for_head_bindings(head);
        self.with_frame(names, |this| n.visit_mut_children_with(this));
    }

    fn visit_mut_for_in_stmt(&mut self, n: &mut ForInStmt) {
        let head = match n.left {
            ForHead::VarDecl(ref var_decl) => Some(&**var_decl),
            _ => None,
        };
        let names = for_head_bindings(head);
        self.with_frame(names, |this| n.visit_mut_children_with(this));
    }

    fn visit_mut_for_of_stmt(&mut self, n: &mut ForOfStmt) {
        let head = match n.left {
            ForHead::VarDecl(ref var_decl) => Some(&**var_decl),
            _ => None,
        };
        let names = for_head_bindings(head);
        self.with_frame(names, |this| n.visit_mut_children_with(this));
    }

    fn visit_mut_switch_stmt(&mut self, n: &mut SwitchStmt) {
        self.with_frame(switch_bindings(n), |this| n.visit_mut_children_with(this));
    }

    fn visit_mut_catch_clause(&mut self, n: &mut CatchClause) {
        self.with_frame(catch_bindings(n), |this| n.visit_mut_children_with(this));
    }

    fn visit_mut_fn_expr(&mut self, n: &mut FnExpr) {
        let names = n.ident.iter().map(|ident| ident.sym.clone()).collect();
        self.with_frame(names, |this| n.visit_mut_children_with(this));
    }

    fn visit_mut_class_expr(&mut self, n: &mut ClassExpr) {
        let names = n.ident.iter().map(|ident| ident.sym.clone()).collect();
        self.with_frame(names, |this| n.visit_mut_children_with(this));
    }

    fn visit_mut_class_prop(&mut self, n: &mut ClassProp) {
        self.with_this(!n.is_static, |this| n.visit_mut_children_with(this));
    }

    fn visit_mut_private_prop(&mut self, n: &mut PrivateProp) {
        self.with_this(!n.is_static, |this| n.visit_mut_children_with(this));
    }

    fn visit_mut_static_block(&mut self, n: &mut StaticBlock) {
        self.with_frame(static_block_bindings(n), |this| {
            this.with_this(false, |this| n.visit_mut_children_with(this))
        });
    }

    fn visit_mut_getter_prop(&mut self, n: &mut GetterProp) {
        self.with_this(true, |this| n.visit_mut_children_with(this));
    }

    fn visit_mut_setter_prop(&mut self, n: &mut SetterProp) {
        let mut names = Vec::new();
        collect_pat_names(&n.param, &mut names);
        self.with_frame(names, |this| {
            this.with_this(true, |this| n.visit_mut_children_with(this))
        });
    }
}

fn print_preprocessed(
    compiler: &dyn TemplateCompiler,
    options: &mut CompileOptions<'_>,
) -> Result<String, CompilerError> {
    let contents = options.contents;
    let template = compiler.preprocess(contents, options)?;
    Ok(compiler.print(&template))
}

/// The template text of a call site
fn call_template(call_expr: &CallExpr, invoked: &str) -> Result<String, TemplateSiteError> {
    let missing = |span: Span| {
        TemplateSiteError::new(
            span,
            TemplateSiteErrorKind::MissingTemplateString(invoked.to_owned()),
        )
    };

    let Some(first) = call_expr.args.first() else {
        return Err(missing(call_expr.span));
    };
    if first.spread.is_some() {
        return Err(missing(first.span()));
    }
    if let Some(text) = static_text(&first.expr) {
        return Ok(text);
    }

    match unwrap_parens(&first.expr) {
        Expr::Tpl(tpl) => Err(TemplateSiteError::new(
            tpl.span,
            TemplateSiteErrorKind::TemplateStringPlaceholders,
        )),
        Expr::TaggedTpl(tagged) => Err(TemplateSiteError::new(
            tagged.span,
            TemplateSiteErrorKind::NestedTaggedTemplate(invoked.to_owned()),
        )),
        other => Err(missing(other.span())),
    }
}

/// The static options of a call site, from its optional second argument
fn call_options(
    call_expr: &CallExpr,
    invoked: &str,
    module: TemplateModule,
) -> Result<StaticOptions, TemplateSiteError> {
    let too_many = |span: Span| {
        TemplateSiteError::new(
            span,
            TemplateSiteErrorKind::TooManyArguments(invoked.to_owned()),
        )
    };

    match call_expr.args.as_slice() {
        [] | [_] => Ok(StaticOptions::default()),
        [_, second] => match (second.spread, unwrap_parens(&second.expr)) {
            (None, Expr::Object(options)) => {
                parse_static_options(invoked, options, module.capabilities())
            }
            _ => Err(too_many(second.span())),
        },
        _ => Err(too_many(call_expr.span)),
    }
}

/// Whether compiler failures become runtime errors for this site
fn insert_runtime_errors(site: &Site) -> Result<bool, TemplateSiteError> {
    let enabled = site.options.flag(&INSERT_RUNTIME_ERRORS).unwrap_or(false);
    if enabled && site.is_rfc931() {
        return Err(TemplateSiteError::new(
            site.span,
            TemplateSiteErrorKind::RuntimeErrorsWithRfc931(site.invoked.to_string()),
        ));
    }
    Ok(enabled)
}

/// Host names referenced by the declared `scope`
fn declared_names(options: &StaticOptions) -> Vec<HbsAtom> {
    options
        .scope
        .iter()
        .flat_map(|scope| scope.entries())
        .map(|(_, js_name)| js_name.clone())
        .filter(|js_name| *js_name != *THIS)
        .collect()
}

/// Options of the `precompileTemplate` call replacing a `template()` site
fn rfc931_options(user_options: Option<&ObjectLit>, locals: &ScopeLocals) -> ObjectLit {
    let mut props = Vec::new();
    let mut has_strict = false;
    let mut has_scope = false;

    for prop in user_options.into_iter().flat_map(|options| options.props.iter()) {
        if is_prop_named(prop, &EVAL) || is_prop_named(prop, &COMPONENT) {
            continue;
        }

        if is_prop_named(prop, &SCOPE) {
            has_scope = true;
            if !locals.is_empty() {
                props.push(scope_prop(locals));
            }
        } else if is_prop_named(prop, &STRICT) {
            has_strict = true;
            props.push(renamed_prop(prop, &STRICT_MODE));
        } else {
            props.push(prop.clone());
        }
    }

    if !has_strict {
        props.push(PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
            key: prop_name(&STRICT_MODE),
            value: Box::new(Expr::Lit(Lit::Bool(Bool {
                span: DUMMY_SP,
                value: true,
            }))),
        }))));
    }
    if !has_scope && !locals.is_empty() {
        props.push(scope_prop(locals));
    }

    ObjectLit {
        span: DUMMY_SP,
        props,
    }
}

fn renamed_prop(prop: &PropOrSpread, key: &HbsAtom) -> PropOrSpread {
    let mut renamed = prop.clone();
    if let PropOrSpread::Prop(ref mut inner) = renamed {
        if let Prop::KeyValue(ref mut key_value) = **inner {
            key_value.key = prop_name(key);
        }
    }
    renamed
}
