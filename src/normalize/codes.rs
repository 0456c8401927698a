/// Province the code table belongs to.
pub const PROVINCE: &str = "JAWA BARAT";

/// BPS regency/city codes for West Java.
const REGION_CODES: [(i64, &str); 27] = [
    (3201, "KABUPATEN BOGOR"),
    (3202, "KABUPATEN SUKABUMI"),
    (3203, "KABUPATEN CIANJUR"),
    (3204, "KABUPATEN BANDUNG"),
    (3205, "KABUPATEN GARUT"),
    (3206, "KABUPATEN TASIKMALAYA"),
    (3207, "KABUPATEN CIAMIS"),
    (3208, "KABUPATEN KUNINGAN"),
    (3209, "KABUPATEN CIREBON"),
    (3210, "KABUPATEN MAJALENGKA"),
    (3211, "KABUPATEN SUMEDANG"),
    (3212, "KABUPATEN INDRAMAYU"),
    (3213, "KABUPATEN SUBANG"),
    (3214, "KABUPATEN PURWAKARTA"),
    (3215, "KABUPATEN KARAWANG"),
    (3216, "KABUPATEN BEKASI"),
    (3217, "KABUPATEN BANDUNG BARAT"),
    (3218, "KABUPATEN PANGANDARAN"),
    (3271, "KOTA BOGOR"),
    (3272, "KOTA SUKABUMI"),
    (3273, "KOTA BANDUNG"),
    (3274, "KOTA CIREBON"),
    (3275, "KOTA BEKASI"),
    (3276, "KOTA DEPOK"),
    (3277, "KOTA CIMAHI"),
    (3278, "KOTA TASIKMALAYA"),
    (3279, "KOTA BANJAR"),
];

/// Display name for a BPS region code.
pub fn region_name(code: i64) -> Option<&'static str> {
    REGION_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Resolve a numeric cell such as `"3273"` or `"3273.0"` to a region name.
///
/// Non-integral or unknown codes resolve to an empty name so the row stays
/// in the table but never joins.
pub fn resolve_code_cell(cell: &str) -> String {
    let Ok(value) = cell.trim().parse::<f64>() else {
        return String::new();
    };
    if value.fract() != 0.0 {
        return String::new();
    }
    region_name(value as i64).unwrap_or_default().to_string()
}
