use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Spanish-first unit synonyms mapped to the canonical abbreviations used in
/// cache keys. Unknown units pass through unchanged.
const UNIT_SYNONYMS: &[(&str, &str)] = &[
    ("gramo", "g"),
    ("gramos", "g"),
    ("gr", "g"),
    ("grs", "g"),
    ("kilogramo", "kg"),
    ("kilogramos", "kg"),
    ("kilo", "kg"),
    ("kilos", "kg"),
    ("mililitro", "ml"),
    ("mililitros", "ml"),
    ("mililiter", "ml"),
    ("litro", "l"),
    ("litros", "l"),
    ("cucharada", "cda"),
    ("cucharadas", "cda"),
    ("tbsp", "cda"),
    ("cucharadita", "cdta"),
    ("cucharaditas", "cdta"),
    ("tsp", "cdta"),
    ("taza", "taza"),
    ("tazas", "taza"),
    ("cup", "taza"),
    ("unidad", "u"),
    ("unidades", "u"),
    ("pieza", "u"),
    ("piezas", "u"),
];

pub fn normalize_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    WHITESPACE_RUN.replace_all(&lower, "_").into_owned()
}

pub fn normalize_unit(unit: Option<&str>) -> String {
    let Some(unit) = unit else {
        return "u".into();
    };
    let lower = unit.trim().to_lowercase();
    if lower.is_empty() {
        return "u".into();
    }
    UNIT_SYNONYMS
        .iter()
        .find(|(from, _)| *from == lower)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or(lower)
}

/// Fingerprint of one estimation request. Two requests for the same
/// ingredient at different quantities are distinct keys on purpose: no
/// unit-scaling arithmetic is ever applied to cached values.
pub fn cache_key(name: &str, quantity: Option<f64>, unit: Option<&str>) -> String {
    format!(
        "{}_{}_{}",
        normalize_name(name),
        format_quantity(quantity),
        normalize_unit(unit)
    )
}

fn format_quantity(quantity: Option<f64>) -> String {
    let q = quantity.unwrap_or(0.0);
    if q.fract() == 0.0 {
        format!("{}", q as i64)
    } else {
        format!("{q}")
    }
}

/// Coerce an arbitrary JSON value to a usable nutrition number:
/// finite and non-negative, otherwise 0.
pub fn safe_num(val: &serde_json::Value) -> f64 {
    let n = match val {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() && n >= 0.0 {
        n
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cache_key_case_and_whitespace_insensitive() {
        assert_eq!(
            cache_key("Pollo", Some(200.0), Some("gr")),
            cache_key("  pollo  ", Some(200.0), Some("Gr"))
        );
        assert_eq!(
            cache_key("arroz  con  pollo", Some(100.0), Some("g")),
            "arroz_con_pollo_100_g"
        );
    }

    #[test]
    fn test_cache_key_unit_synonyms() {
        assert_eq!(
            cache_key("Pollo", Some(200.0), Some("gramos")),
            cache_key("Pollo", Some(200.0), Some("gr"))
        );
        assert_eq!(cache_key("Arroz", Some(100.0), Some("gramos")), "arroz_100_g");
        assert_eq!(cache_key("Leche", Some(1.0), Some("litros")), "leche_1_l");
        assert_eq!(cache_key("Aceite", Some(2.0), Some("tbsp")), "aceite_2_cda");
    }

    #[test]
    fn test_cache_key_missing_quantity_and_unit() {
        assert_eq!(cache_key("Huevo", None, None), "huevo_0_u");
        assert_eq!(cache_key("Huevo", Some(2.0), Some("piezas")), "huevo_2_u");
    }

    #[test]
    fn test_unknown_unit_passes_through() {
        assert_eq!(normalize_unit(Some("Pizca ")), "pizca");
    }

    #[test]
    fn test_fractional_quantity_keeps_decimals() {
        assert_eq!(cache_key("Sal", Some(0.5), Some("cdta")), "sal_0.5_cdta");
    }

    #[test]
    fn test_safe_num_guards() {
        assert_eq!(safe_num(&json!(-5)), 0.0);
        assert_eq!(safe_num(&json!("abc")), 0.0);
        assert_eq!(safe_num(&json!(12.5)), 12.5);
        assert_eq!(safe_num(&json!("7.25")), 7.25);
        assert_eq!(safe_num(&json!(null)), 0.0);
        assert_eq!(safe_num(&json!({"kcal": 1})), 0.0);
    }
}
