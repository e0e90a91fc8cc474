//! The closed table of importable template entry points.

use flagset::{flags, FlagSet};
use hbsc_core::LegacyModule;
use strum_macros::{AsRefStr, EnumIter};

flags! {
    pub enum Capability: u8 {
        /// Usable as a template tag, ``hbs`...` ``
        TemplateLiteral,
        /// Accepts a `scope` option
        Scope,
        /// `template()` from the template compiler API: `eval`, `component`, `strict`
        Rfc931,
    }
}

pub type Capabilities = FlagSet<Capability>;

/// An `(module specifier, exported name)` pair recognized as a template site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter)]
pub enum TemplateModule {
    #[strum(serialize = "ember-cli-htmlbars")]
    EmberCliHtmlbars,
    #[strum(serialize = "ember-cli-htmlbars-inline-precompile")]
    EmberCliHtmlbarsInlinePrecompile,
    #[strum(serialize = "htmlbars-inline-precompile")]
    HtmlbarsInlinePrecompile,
    #[strum(serialize = "@ember/template-compilation")]
    TemplateCompilation,
    #[strum(serialize = "@ember/template-compiler")]
    TemplateCompiler,
}

impl TemplateModule {
    pub fn specifier(self) -> &'static str {
        match self {
            TemplateModule::EmberCliHtmlbars => "ember-cli-htmlbars",
            TemplateModule::EmberCliHtmlbarsInlinePrecompile => {
                "ember-cli-htmlbars-inline-precompile"
            }
            TemplateModule::HtmlbarsInlinePrecompile => "htmlbars-inline-precompile",
            TemplateModule::TemplateCompilation => "@ember/template-compilation",
            TemplateModule::TemplateCompiler => "@ember/template-compiler",
        }
    }

    pub fn export(self) -> &'static str {
        match self {
            TemplateModule::EmberCliHtmlbars => "hbs",
            TemplateModule::EmberCliHtmlbarsInlinePrecompile
            | TemplateModule::HtmlbarsInlinePrecompile => "default",
            TemplateModule::TemplateCompilation => "precompileTemplate",
            TemplateModule::TemplateCompiler => "template",
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            TemplateModule::EmberCliHtmlbars
            | TemplateModule::EmberCliHtmlbarsInlinePrecompile
            | TemplateModule::HtmlbarsInlinePrecompile => Capability::TemplateLiteral.into(),
            TemplateModule::TemplateCompilation => Capability::Scope.into(),
            TemplateModule::TemplateCompiler => Capability::Scope | Capability::Rfc931,
        }
    }

    /// The option which enables this module, `None` when always enabled
    pub fn legacy(self) -> Option<LegacyModule> {
        match self {
            TemplateModule::EmberCliHtmlbars => Some(LegacyModule::EmberCliHtmlbars),
            TemplateModule::EmberCliHtmlbarsInlinePrecompile => {
                Some(LegacyModule::EmberCliHtmlbarsInlinePrecompile)
            }
            TemplateModule::HtmlbarsInlinePrecompile => Some(LegacyModule::HtmlbarsInlinePrecompile),
            TemplateModule::TemplateCompilation | TemplateModule::TemplateCompiler => None,
        }
    }

    pub fn is_enabled(self, enabled_legacy: &[LegacyModule]) -> bool {
        self.legacy()
            .map_or(true, |legacy| enabled_legacy.contains(&legacy))
    }

    /// Finds the enabled module exporting `imported` from `source`
    pub fn lookup(
        source: &str,
        imported: &str,
        enabled_legacy: &[LegacyModule],
    ) -> Option<TemplateModule> {
        enabled_modules(enabled_legacy)
            .find(|module| module.specifier() == source && module.export() == imported)
    }
}

pub fn enabled_modules(
    enabled_legacy: &[LegacyModule],
) -> impl Iterator<Item = TemplateModule> + '_ {
    <TemplateModule as strum::IntoEnumIterator>::iter()
        .filter(move |module| module.is_enabled(enabled_legacy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_keeps_specifiers_in_sync() {
        for module in <TemplateModule as strum::IntoEnumIterator>::iter() {
            assert_eq!(module.as_ref(), module.specifier());
            if let Some(legacy) = module.legacy() {
                assert_eq!(legacy.as_ref(), module.specifier());
            }
        }
    }

    #[test]
    fn it_requires_legacy_modules_to_be_enabled() {
        assert_eq!(
            TemplateModule::lookup("ember-cli-htmlbars", "hbs", &[]),
            None
        );
        assert_eq!(
            TemplateModule::lookup("ember-cli-htmlbars", "hbs", &[LegacyModule::EmberCliHtmlbars]),
            Some(TemplateModule::EmberCliHtmlbars)
        );
        assert_eq!(
            TemplateModule::lookup("@ember/template-compilation", "precompileTemplate", &[]),
            Some(TemplateModule::TemplateCompilation)
        );
        assert_eq!(
            TemplateModule::lookup("@ember/template-compilation", "default", &[]),
            None
        );
    }

    #[test]
    fn it_describes_capabilities() {
        let rfc931 = TemplateModule::TemplateCompiler.capabilities();
        assert!(rfc931.contains(Capability::Scope));
        assert!(rfc931.contains(Capability::Rfc931));
        assert!(!rfc931.contains(Capability::TemplateLiteral));

        let legacy = TemplateModule::HtmlbarsInlinePrecompile.capabilities();
        assert!(legacy.contains(Capability::TemplateLiteral));
        assert!(!legacy.contains(Capability::Scope));
        assert_eq!(enabled_modules(&[]).count(), 2);
    }
}
