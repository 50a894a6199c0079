//! `${name}` interpolation against the variable store.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::store::VariableStore;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^{}]+)\}").expect("placeholder pattern is valid"));

/// Replaces every `${name}` marker with the stored value of `name`.
///
/// Unknown names become the empty string. The text is scanned once, so values
/// that themselves contain markers are inserted verbatim and never expanded.
/// The store is only read.
pub fn interpolate(text: &str, store: &VariableStore) -> String {
    PLACEHOLDER
        .replace_all(text, |captures: &Captures| store.get(&captures[1]).unwrap_or_default().to_string())
        .into_owned()
}
