/// Administrative prefixes removed by the boundary-join variant, in order.
///
/// Removal is plain substring replacement, so a name that happens to contain
/// one of these elsewhere loses those characters too.
const ADMIN_PREFIXES: [&str; 3] = ["KABUPATEN", "KAB.", "ADM."];

/// Prefixes removed by the aggregation variant. `KOTA` goes before `KAB.` so
/// that a `KAB.` exposed by the `KOTA` removal is still caught.
const ADMIN_PREFIXES_WITH_KOTA: [&str; 4] = ["KABUPATEN", "KOTA", "KAB.", "ADM."];

/// Cities that some boundary files nest under a bare name instead of
/// `KOTA<NAME>`.
const EXCEPTIONS: [(&str, &str); 3] = [
    ("KOTADEPOK", "DEPOK"),
    ("KOTACIMAHI", "CIMAHI"),
    ("KOTABANJAR", "BANJAR"),
];

/// Join key used when aggregating raw indicator tables.
///
/// Drops the `KOTA` token together with the other prefixes, which merges a
/// regency and a city sharing a root name ("Kabupaten Bandung" and "Kota
/// Bandung" both become `BANDUNG`).
pub fn normalize_strip_kota(raw: Option<&str>) -> String {
    match raw {
        Some(text) => canonicalize(text, &ADMIN_PREFIXES_WITH_KOTA),
        None => String::new(),
    }
}

/// Join key used when matching statistics rows to boundary geometry.
///
/// Keeps `KOTA` glued to the name (`KOTABANDUNG` stays distinct from
/// `BANDUNG`) and then applies the exception dictionary.
pub fn normalize_retain_kota(raw: Option<&str>) -> String {
    let Some(text) = raw else {
        return String::new();
    };
    let key = canonicalize(text, &ADMIN_PREFIXES);
    match apply_exception(&key) {
        Some(fixed) => fixed.to_string(),
        None => key,
    }
}

/// Corrected key for a known boundary-file mismatch, if `key` is one.
pub fn apply_exception(key: &str) -> Option<&'static str> {
    EXCEPTIONS
        .iter()
        .find(|(from, _)| *from == key)
        .map(|(_, to)| *to)
}

fn canonicalize(text: &str, prefixes: &[&str]) -> String {
    let mut upper = text.to_uppercase();
    for prefix in prefixes {
        upper = upper.replace(prefix, "");
    }
    let collapsed: String = upper.chars().filter(|c| !c.is_whitespace()).collect();
    collapsed.trim().to_string()
}
