/// Derive a page path from its slug.
///
/// A slug that already starts with `/` is used as-is; anything else gets a
/// leading `/`.
pub fn derive_path(slug: &str) -> String {
    if slug.starts_with('/') {
        slug.to_string()
    } else {
        format!("/{slug}")
    }
}
