use phf::{phf_set, Set};

/// Host globals a template may always reference, even though nothing in the
/// surrounding module declares them.
///
/// A name belongs here when it either starts with an uppercase letter or can
/// never become a template keyword, and additionally:
/// - it is callable without `new`;
/// - it needs no lifetime management (so no `setTimeout`);
/// - it is not a single lower-case word that a future HTML element could take;
/// - it does not return a promise.
pub static ALLOWED_GLOBALS: Set<&'static str> = phf_set! {
    // Namespaces
    "globalThis",
    "Atomics",
    "JSON",
    "Math",
    "Reflect",
    "localStorage",
    "sessionStorage",

    // Functions and utilities
    "isNaN",
    "isFinite",
    "parseInt",
    "parseFloat",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "postMessage",
    "structuredClone",

    // Constructors callable without `new`
    "Array",
    "BigInt",
    "Boolean",
    "Date",
    "Number",
    "Object",
    "String",

    // Values
    "Infinity",
    "NaN",
    "isSecureContext",
};

#[inline]
pub fn is_allowed_global(name: &str) -> bool {
    ALLOWED_GLOBALS.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_allows_platform_globals() {
        assert!(is_allowed_global("Math"));
        assert!(is_allowed_global("structuredClone"));
        assert!(is_allowed_global("isSecureContext"));
    }

    #[test]
    fn it_rejects_lifetime_managed_apis() {
        assert!(!is_allowed_global("setTimeout"));
        assert!(!is_allowed_global("fetch"));
        assert!(!is_allowed_global("window"));
    }
}
