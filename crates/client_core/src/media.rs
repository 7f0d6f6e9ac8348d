//! Media path normalization.

pub const DEFAULT_MEDIA_BASE_URL: &str = "http://127.0.0.1:8000/media/";

const MEDIA_SEGMENT: &str = "media/";

/// Resolves a media path against [`DEFAULT_MEDIA_BASE_URL`].
pub fn resolve_file_url(path: Option<&str>) -> String {
    resolve_with_base(DEFAULT_MEDIA_BASE_URL, path)
}

/// Empty or missing → `""`; absolute (has a URI scheme) → unchanged;
/// otherwise one leading `/` and then one leading `media/` are stripped and
/// the rest is appended to `base`. Nothing is encoded or validated.
pub fn resolve_with_base(base: &str, path: Option<&str>) -> String {
    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return String::new();
    };

    if has_scheme(path) {
        return path.to_string();
    }

    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_prefix(MEDIA_SEGMENT).unwrap_or(path);
    format!("{base}{path}")
}

fn has_scheme(path: &str) -> bool {
    let Some((scheme, _)) = path.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUrlResolver {
    base: String,
}

impl Default for FileUrlResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_BASE_URL)
    }
}

impl FileUrlResolver {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn resolve(&self, path: Option<&str>) -> String {
        resolve_with_base(&self.base, path)
    }
}

#[cfg(test)]
#[path = "tests/media_tests.rs"]
mod tests;
