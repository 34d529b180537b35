use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// National ID (iqama) numbers are exactly 10 digits when present.
    pub static ref IQAMA_REGEX: Regex = Regex::new(r"^\d{10}$").unwrap();

    /// Model years are stored as text but must be a 4-digit number.
    pub static ref MODEL_YEAR_REGEX: Regex = Regex::new(r"^\d{4}$").unwrap();
}

/// Reduce a client-supplied filename to a safe basename: path components are
/// stripped and anything outside `[A-Za-z0-9._-]` is replaced, so a stored
/// reference can never escape its record's namespace.
pub fn sanitize_filename(hint: &str) -> String {
    let basename = hint
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim_start_matches('.');
    basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Lowercased extension of a filename, if it has one.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
