//! Commonly used host-side words as static symbols (`HbsAtom`)

use hbsc_core::{hbs_atom, HbsAtom};

lazy_static! {
    // Static option keys
    pub static ref SCOPE: HbsAtom = hbs_atom!("scope");
    pub static ref EVAL: HbsAtom = hbs_atom!("eval");
    pub static ref COMPONENT: HbsAtom = hbs_atom!("component");
    pub static ref STRICT: HbsAtom = hbs_atom!("strict");
    pub static ref STRICT_MODE: HbsAtom = hbs_atom!("strictMode");
    pub static ref INSERT_RUNTIME_ERRORS: HbsAtom = hbs_atom!("insertRuntimeErrors");
    pub static ref MODULE_NAME: HbsAtom = hbs_atom!("moduleName");

    // Host language words
    pub static ref THIS: HbsAtom = hbs_atom!("this");
    pub static ref DEFAULT: HbsAtom = hbs_atom!("default");
    pub static ref NAMESPACE: HbsAtom = hbs_atom!("*");
    pub static ref ARGUMENTS: HbsAtom = hbs_atom!("arguments");
    pub static ref ERROR: HbsAtom = hbs_atom!("Error");

    // Emitted imports
    pub static ref TEMPLATE_FACTORY_MODULE: HbsAtom = hbs_atom!("@ember/template-factory");
    pub static ref CREATE_TEMPLATE_FACTORY: HbsAtom = hbs_atom!("createTemplateFactory");
    pub static ref TEMPLATE_COMPILATION_MODULE: HbsAtom = hbs_atom!("@ember/template-compilation");
    pub static ref PRECOMPILE_TEMPLATE: HbsAtom = hbs_atom!("precompileTemplate");
    pub static ref COMPONENT_MODULE: HbsAtom = hbs_atom!("@ember/component");
    pub static ref SET_COMPONENT_TEMPLATE: HbsAtom = hbs_atom!("setComponentTemplate");
    pub static ref TEMPLATE_ONLY_MODULE: HbsAtom = hbs_atom!("@ember/component/template-only");
}
