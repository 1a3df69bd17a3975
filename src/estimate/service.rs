use std::collections::HashMap;

use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use super::cache_key::{cache_key, safe_num};
use super::llm::EstimateError;
use super::repo::{self, NutritionValues};
use crate::state::AppState;

/// Whether one estimation request may be answered from the persisted cache.
/// `Bypass` is the explicit "force recalculate" request: the cache lookup is
/// skipped and the fresh result overwrites the cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    UseCache,
    Bypass,
}

#[derive(Debug, Clone)]
pub struct EstimateItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub mode: CacheMode,
}

impl EstimateItem {
    pub fn key(&self) -> String {
        cache_key(&self.name, self.quantity, self.unit.as_deref())
    }
}

#[derive(Debug, Serialize)]
pub struct EstimateResult {
    pub id: Uuid,
    #[serde(flatten)]
    pub values: NutritionValues,
}

/// Resolve nutrition for a batch: answer what we can from the cache, send
/// the rest in one prompt to the estimator, persist everything.
///
/// Estimator failure is not an error for the caller: the whole missing
/// sub-batch degrades to all-zero values.
pub async fn estimate_batch(
    state: &AppState,
    items: Vec<EstimateItem>,
) -> anyhow::Result<Vec<EstimateResult>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let lookup_keys: Vec<String> = items
        .iter()
        .filter(|i| i.mode == CacheMode::UseCache)
        .map(EstimateItem::key)
        .collect();

    let mut resolved = repo::fetch_cached(&state.db, &lookup_keys).await?;

    let misses = cache_misses(&items, &resolved);

    if !misses.is_empty() {
        let prompt = build_prompt(&misses);
        let max_tokens = misses.len() as u32 * 80;

        let reply = state.estimator.complete(&prompt, max_tokens).await;
        let values = values_from_completion(reply, misses.len());

        for (item, v) in misses.iter().zip(&values) {
            let key = item.key();
            repo::upsert_cache(&state.db, &key, v).await?;
            resolved.insert(key, *v);
        }
    }

    let mut results = Vec::with_capacity(items.len());
    for item in &items {
        let values = resolved.get(&item.key()).copied().unwrap_or_default();
        repo::apply_to_ingredient(&state.db, item.id, &values).await?;
        results.push(EstimateResult {
            id: item.id,
            values,
        });
    }
    Ok(results)
}

/// Resolve one estimator call into exactly `n` records. Transport and API
/// failures degrade the whole sub-batch to zeros instead of surfacing.
pub(crate) fn values_from_completion(
    reply: Result<String, EstimateError>,
    n: usize,
) -> Vec<NutritionValues> {
    match reply {
        Ok(raw) => parse_response(&raw, n),
        Err(e) => {
            error!(error = %e, count = n, "estimation failed; zeroing batch");
            vec![NutritionValues::default(); n]
        }
    }
}

/// Items that must go to the estimator: cache bypasses plus genuine misses.
/// Duplicate keys within one batch are asked only once.
pub(crate) fn cache_misses<'a>(
    items: &'a [EstimateItem],
    resolved: &HashMap<String, NutritionValues>,
) -> Vec<&'a EstimateItem> {
    let mut seen: Vec<String> = Vec::new();
    items
        .iter()
        .filter(|i| i.mode == CacheMode::Bypass || !resolved.contains_key(&i.key()))
        .filter(|i| {
            let key = i.key();
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        })
        .collect()
}

pub(crate) fn build_prompt(items: &[&EstimateItem]) -> String {
    let lines: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(idx, i)| {
            let qty = i
                .quantity
                .map(|q| {
                    if q.fract() == 0.0 {
                        format!("{}", q as i64)
                    } else {
                        format!("{q}")
                    }
                })
                .unwrap_or_default();
            let unit = i.unit.as_deref().unwrap_or_default();
            format!("{}. {}{} {}", idx + 1, qty, unit, i.name)
        })
        .collect();

    format!(
        "Nutrition data for {} ingredient(s). Respond ONLY with a JSON array, no text, no markdown.\n\
         Each object must have exactly these keys (numbers only, 0 if unknown):\n\
         {{\"kcal\":0,\"protein_g\":0,\"carbs_g\":0,\"fat_g\":0,\"fiber_g\":0,\"sodium_mg\":0,\"vitamin_c_mg\":0,\"vitamin_d_ui\":0,\"calcium_mg\":0,\"iron_mg\":0,\"potassium_mg\":0}}\n\
         Ingredients:\n{}",
        items.len(),
        lines.join("\n")
    )
}

/// Parse the estimator's reply into exactly `n` records, positionally matched
/// to the request order. The estimator promises an array of length `n`; a
/// short, long or malformed reply never breaks the contract — missing or
/// unparsable positions become all-zero records.
pub(crate) fn parse_response(raw: &str, n: usize) -> Vec<NutritionValues> {
    let stripped = strip_code_fences(raw);
    let parsed: Vec<serde_json::Value> = match serde_json::from_str(stripped) {
        Ok(serde_json::Value::Array(arr)) => arr,
        Ok(_) | Err(_) => {
            warn!("estimator reply was not a JSON array; zeroing batch");
            Vec::new()
        }
    };

    (0..n)
        .map(|i| parsed.get(i).map(nutrition_from_json).unwrap_or_default())
        .collect()
}

fn strip_code_fences(raw: &str) -> &str {
    let s = raw.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```JSON"))
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    s.strip_suffix("```").unwrap_or(s).trim()
}

fn nutrition_from_json(obj: &serde_json::Value) -> NutritionValues {
    let field = |key: &str| safe_num(obj.get(key).unwrap_or(&serde_json::Value::Null));
    NutritionValues {
        kcal: field("kcal"),
        protein_g: field("protein_g"),
        carbs_g: field("carbs_g"),
        fat_g: field("fat_g"),
        fiber_g: field("fiber_g"),
        sodium_mg: field("sodium_mg"),
        vitamin_c_mg: field("vitamin_c_mg"),
        vitamin_d_ui: field("vitamin_d_ui"),
        calcium_mg: field("calcium_mg"),
        iron_mg: field("iron_mg"),
        potassium_mg: field("potassium_mg"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, qty: f64, unit: &str, mode: CacheMode) -> EstimateItem {
        EstimateItem {
            id: Uuid::new_v4(),
            name: name.into(),
            quantity: Some(qty),
            unit: Some(unit.into()),
            mode,
        }
    }

    #[test]
    fn test_cache_hit_is_not_sent_to_estimator() {
        let items = vec![
            item("Arroz", 100.0, "gramos", CacheMode::UseCache),
            item("Pollo", 200.0, "g", CacheMode::UseCache),
        ];
        let mut resolved = HashMap::new();
        resolved.insert(
            "arroz_100_g".to_string(),
            NutritionValues {
                kcal: 130.0,
                ..Default::default()
            },
        );

        let misses = cache_misses(&items, &resolved);
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].name, "Pollo");
    }

    #[test]
    fn test_bypass_goes_to_estimator_even_when_cached() {
        let items = vec![item("Arroz", 100.0, "g", CacheMode::Bypass)];
        let mut resolved = HashMap::new();
        resolved.insert("arroz_100_g".to_string(), NutritionValues::default());

        let misses = cache_misses(&items, &resolved);
        assert_eq!(misses.len(), 1);
    }

    #[test]
    fn test_duplicate_keys_asked_once() {
        let items = vec![
            item("Arroz", 100.0, "g", CacheMode::UseCache),
            item("arroz", 100.0, "gramos", CacheMode::UseCache),
        ];
        let misses = cache_misses(&items, &HashMap::new());
        assert_eq!(misses.len(), 1);
    }

    #[test]
    fn test_build_prompt_numbers_items_in_order() {
        let a = item("Arroz", 100.0, "g", CacheMode::UseCache);
        let b = item("Pollo", 200.0, "g", CacheMode::UseCache);
        let prompt = build_prompt(&[&a, &b]);
        assert!(prompt.contains("2 ingredient(s)"));
        assert!(prompt.contains("1. 100g Arroz"));
        assert!(prompt.contains("2. 200g Pollo"));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn test_parse_response_plain_array() {
        let raw = r#"[{"kcal":130,"protein_g":2.7},{"kcal":239,"protein_g":27}]"#;
        let parsed = parse_response(raw, 2);
        assert_eq!(parsed[0].kcal, 130.0);
        assert_eq!(parsed[0].protein_g, 2.7);
        assert_eq!(parsed[0].carbs_g, 0.0);
        assert_eq!(parsed[1].kcal, 239.0);
    }

    #[test]
    fn test_parse_response_strips_code_fences() {
        let raw = "```json\n[{\"kcal\":52}]\n```";
        let parsed = parse_response(raw, 1);
        assert_eq!(parsed[0].kcal, 52.0);
    }

    #[test]
    fn test_parse_response_pads_short_reply_with_zeros() {
        let raw = r#"[{"kcal":100}]"#;
        let parsed = parse_response(raw, 3);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].kcal, 100.0);
        assert_eq!(parsed[1], NutritionValues::default());
        assert_eq!(parsed[2], NutritionValues::default());
    }

    #[test]
    fn test_parse_response_malformed_reply_zeroes_everything() {
        for raw in ["not json at all", "{\"kcal\":1}", ""] {
            let parsed = parse_response(raw, 3);
            assert_eq!(parsed.len(), 3);
            assert!(parsed.iter().all(|v| *v == NutritionValues::default()));
        }
    }

    #[test]
    fn test_estimator_failure_zeroes_whole_sub_batch() {
        let values = values_from_completion(Err(EstimateError::EmptyCompletion), 3);
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|v| *v == NutritionValues::default()));
    }

    #[test]
    fn test_estimator_success_still_parsed_positionally() {
        let values = values_from_completion(Ok(r#"[{"kcal":42}]"#.to_string()), 2);
        assert_eq!(values[0].kcal, 42.0);
        assert_eq!(values[1], NutritionValues::default());
    }

    #[test]
    fn test_parse_response_coerces_bad_fields() {
        let raw = r#"[{"kcal":-10,"protein_g":"abc","carbs_g":"14.5"}]"#;
        let parsed = parse_response(raw, 1);
        assert_eq!(parsed[0].kcal, 0.0);
        assert_eq!(parsed[0].protein_g, 0.0);
        assert_eq!(parsed[0].carbs_g, 14.5);
    }
}
