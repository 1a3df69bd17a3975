use serde::Deserialize;
use uuid::Uuid;

use super::service::{CacheMode, EstimateItem, EstimateResult};

/// The endpoint accepts either a batch or a single ingredient object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EstimateRequest {
    Batch(Vec<EstimateRequestItem>),
    Single(EstimateRequestItem),
}

#[derive(Debug, Deserialize)]
pub struct EstimateRequestItem {
    #[serde(alias = "ingredientId")]
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    #[serde(default, alias = "forceRecalc")]
    pub force_recalc: bool,
}

impl EstimateRequest {
    /// Flatten to service items. Entries missing an id or a usable name are
    /// dropped silently; the caller never sees an error for them.
    pub fn into_items(self) -> Vec<EstimateItem> {
        let raw = match self {
            Self::Batch(items) => items,
            Self::Single(item) => vec![item],
        };
        raw.into_iter()
            .filter_map(|i| {
                let id = i.id?;
                let name = i.name.filter(|n| !n.trim().is_empty())?;
                Some(EstimateItem {
                    id,
                    name,
                    quantity: i.quantity,
                    unit: i.unit,
                    mode: if i.force_recalc {
                        CacheMode::Bypass
                    } else {
                        CacheMode::UseCache
                    },
                })
            })
            .collect()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct EstimateResponse {
    pub results: Vec<EstimateResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_entries_dropped_silently() {
        let req = EstimateRequest::Batch(vec![
            EstimateRequestItem {
                id: Some(Uuid::new_v4()),
                name: Some("Arroz".into()),
                quantity: Some(100.0),
                unit: Some("g".into()),
                force_recalc: false,
            },
            EstimateRequestItem {
                id: None,
                name: Some("Pollo".into()),
                quantity: None,
                unit: None,
                force_recalc: false,
            },
            EstimateRequestItem {
                id: Some(Uuid::new_v4()),
                name: Some("   ".into()),
                quantity: None,
                unit: None,
                force_recalc: false,
            },
        ]);
        let items = req.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Arroz");
    }

    #[test]
    fn test_force_recalc_maps_to_bypass() {
        let req = EstimateRequest::Single(EstimateRequestItem {
            id: Some(Uuid::new_v4()),
            name: Some("Arroz".into()),
            quantity: Some(100.0),
            unit: Some("g".into()),
            force_recalc: true,
        });
        let items = req.into_items();
        assert_eq!(items[0].mode, CacheMode::Bypass);
    }

    #[test]
    fn test_single_object_with_camel_case_keys() {
        let json = r#"{"ingredientId":"7f4df6a7-6a29-4b52-ae26-0e49e0788767","name":"Arroz","forceRecalc":true}"#;
        let req: EstimateRequest = serde_json::from_str(json).unwrap();
        let items = req.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].mode, CacheMode::Bypass);
    }
}
