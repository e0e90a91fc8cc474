//! Shared structures of the `hbsc` project: the template AST, the interfaces
//! of the template compiler and of template AST plugins, and the small tables
//! every other crate agrees on.

mod compiler;
mod error;
mod globals;
mod options;
mod plugin;
pub mod template;

pub use compiler::*;
pub use error::*;
pub use globals::{is_allowed_global, ALLOWED_GLOBALS};
pub use options::*;
pub use plugin::*;

/// Interned string used for every name the engine handles:
/// template names, host identifiers and module specifiers.
pub type HbsAtom = swc_core::ecma::atoms::Atom;

/// Creates an [`HbsAtom`] from a string literal.
#[macro_export]
macro_rules! hbs_atom {
    ($lit: literal) => {
        $crate::HbsAtom::from($lit)
    };
}
