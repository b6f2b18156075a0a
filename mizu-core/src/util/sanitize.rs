/// Map an archive entry name to a flat, filesystem-safe file name.
///
/// Separators and anything outside `[A-Za-z0-9._-]` become `_`, a leading dot
/// is replaced, and a short BLAKE3 prefix over the raw name keeps entries such
/// as `a/b.jpg` and `a_b.jpg` apart.
pub fn cache_file_name(entry_name: &str) -> String {
    let digest = blake3::hash(entry_name.as_bytes());
    let tag = hex::encode(&digest.as_bytes()[..4]);
    format!("{tag}-{}", sanitize_component(entry_name))
}

pub fn sanitize_component(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.starts_with('.') {
        out.replace_range(0..1, "_");
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}
