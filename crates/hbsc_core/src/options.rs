use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumString};

/// How free references of a template get connected to host bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// Only names declared in `scope` (or bound through the jsutils API) are captured.
    Explicit,
    /// Every free reference matching a visible host binding is captured.
    Implicit,
}

/// What the template sites become in the output module.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TargetFormat {
    /// Fully compiled templates wrapped in a template factory
    #[default]
    Wire,
    /// Templates stay as text, ready for further processing
    Hbs,
}

/// Importable template tags from before `@ember/template-compilation` existed.
/// They are only recognized when enabled in the options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, AsRefStr, Display, EnumString)]
pub enum LegacyModule {
    #[serde(rename = "ember-cli-htmlbars")]
    #[strum(serialize = "ember-cli-htmlbars")]
    EmberCliHtmlbars,
    #[serde(rename = "ember-cli-htmlbars-inline-precompile")]
    #[strum(serialize = "ember-cli-htmlbars-inline-precompile")]
    EmberCliHtmlbarsInlinePrecompile,
    #[serde(rename = "htmlbars-inline-precompile")]
    #[strum(serialize = "htmlbars-inline-precompile")]
    HtmlbarsInlinePrecompile,
}
