//! Join-key normalization for page paths.

/// Normalizes a page path or absolute URL into the join key shared by all
/// sources.
///
/// Scheme and host are stripped, query strings and fragments dropped,
/// repeated slashes collapsed, and the trailing slash removed (except for the
/// site root). The result always starts with `/`.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim();

    let without_origin = match trimmed.find("://") {
        Some(idx) => {
            let after_scheme = &trimmed[idx + 3..];
            after_scheme
                .find('/')
                .map_or("/", |slash| &after_scheme[slash..])
        }
        None => trimmed,
    };

    let without_query = without_origin
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    let segments: Vec<&str> = without_query.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Returns the CMS slug for a page path: its last non-empty segment.
///
/// `/linux-commands/` and `https://example.org/guides/ssh-setup` yield
/// `linux-commands` and `ssh-setup`; the site root yields `None`.
#[must_use]
pub fn post_name_from_path(path: &str) -> Option<String> {
    normalize_path(path)
        .rsplit('/')
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
