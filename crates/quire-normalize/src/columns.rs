//! Column-name canonicalization.

/// Canonicalize one raw column name: trim, lowercase, collapse internal
/// whitespace runs into a single underscore.
fn canonical_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_gap = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            pending_gap = !out.is_empty();
            continue;
        }
        if pending_gap {
            out.push('_');
            pending_gap = false;
        }
        out.extend(ch.to_lowercase());
    }
    if out.is_empty() {
        out.push_str("column");
    }
    out
}

/// Canonicalize a header, disambiguating duplicates by `_2`, `_3`, ...
/// suffixes in encounter order. Suffixing happens after canonicalization,
/// so names that only differ in case or padding collide and get suffixed.
pub fn canonical_column_names(raw: &[String]) -> Vec<String> {
    let mut taken: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw {
        let base = canonical_name(name);
        let mut candidate = base.clone();
        let mut n = 1usize;
        while taken.contains(&candidate) {
            n += 1;
            candidate = format!("{base}_{n}");
        }
        taken.push(candidate);
    }
    taken
}
