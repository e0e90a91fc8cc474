use hbsc_core::HbsAtom;
use tracing::trace;

/// Finds a name similar to `desired` for which `is_used` is false:
/// `desired` itself, then `desired0`, `desired1`, and so on.
pub fn unused_name_like(desired: &str, mut is_used: impl FnMut(&str) -> bool) -> HbsAtom {
    if !is_used(desired) {
        return HbsAtom::from(desired);
    }

    let mut candidate = String::with_capacity(desired.len() + 2);
    let mut counter = 0usize;
    loop {
        candidate.clear();
        candidate.push_str(desired);
        candidate.push_str(&counter.to_string());

        if !is_used(&candidate) {
            trace!(desired, allocated = candidate.as_str(), "Allocated name");
            return HbsAtom::from(candidate.as_str());
        }
        counter += 1;
    }
}

/// Turns a name hint or a module path segment into an identifier:
/// `template-only` -> `templateOnly`, `my lib!` -> `myLib`.
pub fn identifier_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut uppercase_next = false;

    for ch in raw.chars() {
        let is_legal = ch.is_ascii_alphanumeric() || ch == '_' || ch == '$';
        if !is_legal {
            // Illegal chars camelize the word after them, unless they lead
            uppercase_next = !out.is_empty();
            continue;
        }

        if uppercase_next {
            out.extend(ch.to_uppercase());
            uppercase_next = false;
        } else {
            out.push(ch);
        }
    }

    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if out.is_empty() {
        out.push('a');
    }
    out
}

/// Whether `name` can be written as a bare identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$')
}
