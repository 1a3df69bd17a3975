//! Pure weekly rollups over the planner entries of one week. No IO here:
//! everything is a function of the entry snapshot, so report rendering and
//! the planner endpoints share one arithmetic.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::repo::Ingredient;
use crate::planner::repo::{DayOfWeek, EntryWithDish};

/// Chart placeholder drawn for days with no calories at all, so an empty
/// day renders as a visible marker instead of a blank column.
pub const EMPTY_DAY_MARKER: f64 = 80.0;

pub const UNCATEGORIZED_NAME: &str = "Sin categoría";
pub const UNCATEGORIZED_COLOR: &str = "#9CA3AF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Kcal,
    ProteinG,
    CarbsG,
    FatG,
    FiberG,
    SodiumMg,
    VitaminCMg,
    VitaminDUi,
    CalciumMg,
    IronMg,
    PotassiumMg,
}

impl Nutrient {
    pub const ALL: [Nutrient; 11] = [
        Nutrient::Kcal,
        Nutrient::ProteinG,
        Nutrient::CarbsG,
        Nutrient::FatG,
        Nutrient::FiberG,
        Nutrient::SodiumMg,
        Nutrient::VitaminCMg,
        Nutrient::VitaminDUi,
        Nutrient::CalciumMg,
        Nutrient::IronMg,
        Nutrient::PotassiumMg,
    ];

    pub fn of(self, i: &Ingredient) -> f64 {
        match self {
            Nutrient::Kcal => i.estimated_kcal,
            Nutrient::ProteinG => i.protein_g,
            Nutrient::CarbsG => i.carbs_g,
            Nutrient::FatG => i.fat_g,
            Nutrient::FiberG => i.fiber_g,
            Nutrient::SodiumMg => i.sodium_mg,
            Nutrient::VitaminCMg => i.vitamin_c_mg,
            Nutrient::VitaminDUi => i.vitamin_d_ui,
            Nutrient::CalciumMg => i.calcium_mg,
            Nutrient::IronMg => i.iron_mg,
            Nutrient::PotassiumMg => i.potassium_mg,
        }
    }

    pub fn label_es(self) -> &'static str {
        match self {
            Nutrient::Kcal => "Calorías",
            Nutrient::ProteinG => "Proteínas",
            Nutrient::CarbsG => "Carbohidratos",
            Nutrient::FatG => "Grasas",
            Nutrient::FiberG => "Fibra",
            Nutrient::SodiumMg => "Sodio",
            Nutrient::VitaminCMg => "Vitamina C",
            Nutrient::VitaminDUi => "Vitamina D",
            Nutrient::CalciumMg => "Calcio",
            Nutrient::IronMg => "Hierro",
            Nutrient::PotassiumMg => "Potasio",
        }
    }

    pub fn unit_label(self) -> &'static str {
        match self {
            Nutrient::Kcal => "kcal",
            Nutrient::ProteinG | Nutrient::CarbsG | Nutrient::FatG | Nutrient::FiberG => "g",
            Nutrient::VitaminDUi => "UI",
            _ => "mg",
        }
    }
}

/// Fixed weekly reference values (daily recommendation × 7). Injected rather
/// than read from module globals so tests can substitute their own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeeklyReferences {
    pub kcal: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sodium_mg: f64,
    pub vitamin_c_mg: f64,
    pub vitamin_d_ui: f64,
    pub calcium_mg: f64,
    pub iron_mg: f64,
    pub potassium_mg: f64,
}

impl Default for WeeklyReferences {
    fn default() -> Self {
        Self {
            kcal: 14000.0,
            protein_g: 350.0,
            carbs_g: 1925.0,
            fat_g: 546.0,
            fiber_g: 196.0,
            sodium_mg: 16100.0,
            vitamin_c_mg: 560.0,
            vitamin_d_ui: 4200.0,
            calcium_mg: 7000.0,
            iron_mg: 126.0,
            potassium_mg: 24500.0,
        }
    }
}

impl WeeklyReferences {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Kcal => self.kcal,
            Nutrient::ProteinG => self.protein_g,
            Nutrient::CarbsG => self.carbs_g,
            Nutrient::FatG => self.fat_g,
            Nutrient::FiberG => self.fiber_g,
            Nutrient::SodiumMg => self.sodium_mg,
            Nutrient::VitaminCMg => self.vitamin_c_mg,
            Nutrient::VitaminDUi => self.vitamin_d_ui,
            Nutrient::CalciumMg => self.calcium_mg,
            Nutrient::IronMg => self.iron_mg,
            Nutrient::PotassiumMg => self.potassium_mg,
        }
    }
}

pub fn coverage_pct(actual: f64, reference: f64) -> f64 {
    if reference > 0.0 {
        actual / reference * 100.0
    } else {
        0.0
    }
}

/// Three-tier coverage classification against the weekly reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Semaphore {
    Optimal,
    Review,
    Critical,
}

impl Semaphore {
    pub fn classify(pct: f64) -> Self {
        if (80.0..=120.0).contains(&pct) {
            Semaphore::Optimal
        } else if (50.0..80.0).contains(&pct) || (pct > 120.0 && pct <= 150.0) {
            Semaphore::Review
        } else {
            Semaphore::Critical
        }
    }

    pub fn label_es(self) -> &'static str {
        match self {
            Semaphore::Optimal => "Óptimo",
            Semaphore::Review => "Revisar",
            Semaphore::Critical => "Crítico",
        }
    }

    pub fn color(self) -> (u8, u8, u8) {
        match self {
            Semaphore::Optimal => (34, 197, 94),
            Semaphore::Review => (234, 179, 8),
            Semaphore::Critical => (239, 68, 68),
        }
    }
}

pub fn dish_total(entry: &EntryWithDish, nutrient: Nutrient) -> f64 {
    entry
        .dish
        .ingredients
        .iter()
        .map(|i| nutrient.of(i))
        .sum()
}

pub fn total(entries: &[EntryWithDish], nutrient: Nutrient) -> f64 {
    entries.iter().map(|e| dish_total(e, nutrient)).sum()
}

pub fn total_cost(entries: &[EntryWithDish]) -> f64 {
    entries
        .iter()
        .flat_map(|e| &e.dish.ingredients)
        .map(|i| i.estimated_cost)
        .sum()
}

pub fn day_entries<'a>(entries: &'a [EntryWithDish], day: DayOfWeek) -> Vec<&'a EntryWithDish> {
    entries
        .iter()
        .filter(|e| e.entry.day_of_week == day)
        .collect()
}

pub fn day_total(entries: &[EntryWithDish], day: DayOfWeek, nutrient: Nutrient) -> f64 {
    entries
        .iter()
        .filter(|e| e.entry.day_of_week == day)
        .map(|e| dish_total(e, nutrient))
        .sum()
}

#[derive(Debug, Clone, Serialize)]
pub struct ProteinBucket {
    pub protein_type_id: Option<Uuid>,
    pub name: String,
    pub color: String,
    pub grams: f64,
    pub dish_count: usize,
    /// Share of the week's total protein, 0 when the total is 0.
    pub percentage: f64,
}

/// Group entries by protein type; dishes without one fall into a synthetic
/// uncategorized bucket. Sorted by grams descending.
pub fn protein_buckets(entries: &[EntryWithDish]) -> Vec<ProteinBucket> {
    let mut buckets: Vec<ProteinBucket> = Vec::new();

    for entry in entries {
        let grams = dish_total(entry, Nutrient::ProteinG);
        let (id, name, color) = match &entry.dish.protein_type {
            Some(pt) => (Some(pt.id), pt.name.as_str(), pt.color.as_str()),
            None => (None, UNCATEGORIZED_NAME, UNCATEGORIZED_COLOR),
        };
        match buckets.iter_mut().find(|b| b.protein_type_id == id) {
            Some(bucket) => {
                bucket.grams += grams;
                bucket.dish_count += 1;
            }
            None => buckets.push(ProteinBucket {
                protein_type_id: id,
                name: name.to_string(),
                color: color.to_string(),
                grams,
                dish_count: 1,
                percentage: 0.0,
            }),
        }
    }

    let total_grams: f64 = buckets.iter().map(|b| b.grams).sum();
    for bucket in &mut buckets {
        bucket.percentage = if total_grams > 0.0 {
            bucket.grams / total_grams * 100.0
        } else {
            0.0
        };
    }

    buckets.sort_by(|a, b| b.grams.partial_cmp(&a.grams).unwrap_or(std::cmp::Ordering::Equal));
    buckets
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSegment {
    pub protein_type_id: Option<Uuid>,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySeries {
    pub day: DayOfWeek,
    pub label: &'static str,
    /// Per-protein-type values, scaled so the stack caps at the daily limit.
    pub segments: Vec<ChartSegment>,
    pub excess: f64,
    pub total: f64,
    pub empty_marker: f64,
}

/// Stacked-bar series for the seven canonical days. Segments are scaled by
/// `min(total, limit) / total` so the visible stack never exceeds the limit;
/// the overflow is reported as a separate excess series.
pub fn daily_chart_series(
    entries: &[EntryWithDish],
    nutrient: Nutrient,
    daily_limit: f64,
) -> Vec<DaySeries> {
    DayOfWeek::ALL
        .iter()
        .map(|&day| {
            let mut segments: Vec<ChartSegment> = Vec::new();
            let mut total = 0.0;

            for entry in entries.iter().filter(|e| e.entry.day_of_week == day) {
                let value = dish_total(entry, nutrient);
                let id = entry.dish.protein_type.as_ref().map(|pt| pt.id);
                match segments.iter_mut().find(|s| s.protein_type_id == id) {
                    Some(seg) => seg.value += value,
                    None => segments.push(ChartSegment {
                        protein_type_id: id,
                        value,
                    }),
                }
                total += value;
            }

            let scale = if total > 0.0 {
                total.min(daily_limit) / total
            } else {
                1.0
            };
            for seg in &mut segments {
                seg.value *= scale;
            }

            DaySeries {
                day,
                label: day.short_label_es(),
                segments,
                excess: (total - daily_limit).max(0.0),
                total,
                empty_marker: if total == 0.0 { EMPTY_DAY_MARKER } else { 0.0 },
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use time::macros::{date, datetime};

    use super::*;
    use crate::catalog::repo::{Dish, DishDetails, ProteinType};
    use crate::planner::repo::WeekPlanEntry;

    pub(crate) fn ingredient(kcal: f64, protein: f64, cost: f64) -> Ingredient {
        Ingredient {
            id: Uuid::new_v4(),
            dish_id: Uuid::new_v4(),
            name: "ing".into(),
            quantity: Some(100.0),
            unit: Some("g".into()),
            estimated_cost: cost,
            estimated_kcal: kcal,
            protein_g: protein,
            carbs_g: kcal / 10.0,
            fat_g: kcal / 20.0,
            fiber_g: 1.0,
            sodium_mg: 10.0,
            vitamin_c_mg: 2.0,
            vitamin_d_ui: 5.0,
            calcium_mg: 20.0,
            iron_mg: 0.5,
            potassium_mg: 100.0,
            estimated_at: Some(datetime!(2024-03-01 12:00 UTC)),
            created_at: datetime!(2024-03-01 12:00 UTC),
        }
    }

    pub(crate) fn protein_type(n: u128, name: &str, color: &str) -> ProteinType {
        ProteinType {
            id: Uuid::from_u128(n),
            workspace_id: Uuid::from_u128(1),
            name: name.into(),
            color: color.into(),
            created_at: datetime!(2024-03-01 12:00 UTC),
        }
    }

    pub(crate) fn entry(
        day: DayOfWeek,
        dish_name: &str,
        pt: Option<ProteinType>,
        ingredients: Vec<Ingredient>,
    ) -> EntryWithDish {
        let dish_id = Uuid::new_v4();
        EntryWithDish {
            entry: WeekPlanEntry {
                id: Uuid::new_v4(),
                workspace_id: Uuid::from_u128(1),
                dish_id,
                week_start: date!(2024 - 03 - 04),
                day_of_week: day,
                meal_slot: None,
                meal_slot_id: None,
                created_at: datetime!(2024-03-04 08:00 UTC),
            },
            dish: DishDetails {
                dish: Dish {
                    id: dish_id,
                    workspace_id: Uuid::from_u128(1),
                    protein_type_id: pt.as_ref().map(|p| p.id),
                    name: dish_name.into(),
                    description: None,
                    created_at: datetime!(2024-03-01 12:00 UTC),
                },
                protein_type: pt,
                ingredients,
            },
        }
    }

    #[test]
    fn test_totals_sum_every_ingredient() {
        let entries = vec![
            entry(
                DayOfWeek::Monday,
                "Arroz con pollo",
                None,
                vec![ingredient(130.0, 2.7, 1.5), ingredient(239.0, 27.0, 3.0)],
            ),
            entry(
                DayOfWeek::Tuesday,
                "Ensalada",
                None,
                vec![ingredient(50.0, 1.0, 0.8)],
            ),
        ];
        assert_eq!(total(&entries, Nutrient::Kcal), 419.0);
        assert_eq!(total(&entries, Nutrient::ProteinG), 30.7);
        assert!((total_cost(&entries) - 5.3).abs() < 1e-9);
    }

    #[test]
    fn test_aggregation_additivity() {
        let a = vec![entry(
            DayOfWeek::Monday,
            "A",
            None,
            vec![ingredient(100.0, 10.0, 1.0)],
        )];
        let b = vec![
            entry(DayOfWeek::Friday, "B", None, vec![ingredient(200.0, 5.0, 2.0)]),
            entry(DayOfWeek::Sunday, "C", None, vec![ingredient(80.0, 3.0, 0.5)]),
        ];
        let mut union = a.clone();
        union.extend(b.clone());

        for nutrient in Nutrient::ALL {
            let lhs = total(&union, nutrient);
            let rhs = total(&a, nutrient) + total(&b, nutrient);
            assert!((lhs - rhs).abs() < 1e-9, "{nutrient:?}: {lhs} != {rhs}");
        }
    }

    #[test]
    fn test_day_total_filters_by_day() {
        let entries = vec![
            entry(DayOfWeek::Monday, "A", None, vec![ingredient(100.0, 1.0, 0.0)]),
            entry(DayOfWeek::Monday, "B", None, vec![ingredient(50.0, 1.0, 0.0)]),
            entry(DayOfWeek::Thursday, "C", None, vec![ingredient(70.0, 1.0, 0.0)]),
        ];
        assert_eq!(day_total(&entries, DayOfWeek::Monday, Nutrient::Kcal), 150.0);
        assert_eq!(day_total(&entries, DayOfWeek::Thursday, Nutrient::Kcal), 70.0);
        assert_eq!(day_total(&entries, DayOfWeek::Sunday, Nutrient::Kcal), 0.0);
    }

    #[test]
    fn test_semaphore_boundaries() {
        assert_eq!(Semaphore::classify(79.9), Semaphore::Review);
        assert_eq!(Semaphore::classify(80.0), Semaphore::Optimal);
        assert_eq!(Semaphore::classify(120.0), Semaphore::Optimal);
        assert_eq!(Semaphore::classify(120.1), Semaphore::Review);
        assert_eq!(Semaphore::classify(49.9), Semaphore::Critical);
        assert_eq!(Semaphore::classify(50.0), Semaphore::Review);
        assert_eq!(Semaphore::classify(150.0), Semaphore::Review);
        assert_eq!(Semaphore::classify(150.1), Semaphore::Critical);
        assert_eq!(Semaphore::classify(0.0), Semaphore::Critical);
    }

    #[test]
    fn test_coverage_pct_zero_reference() {
        assert_eq!(coverage_pct(100.0, 0.0), 0.0);
        assert_eq!(coverage_pct(70.0, 350.0), 20.0);
    }

    #[test]
    fn test_protein_buckets_share_sums_to_100() {
        let chicken = protein_type(10, "Pollo", "#F5A623");
        let fish = protein_type(11, "Pescado", "#2D9CDB");
        let entries = vec![
            entry(
                DayOfWeek::Monday,
                "A",
                Some(chicken.clone()),
                vec![ingredient(0.0, 30.0, 0.0)],
            ),
            entry(
                DayOfWeek::Tuesday,
                "B",
                Some(fish),
                vec![ingredient(0.0, 20.0, 0.0)],
            ),
            entry(DayOfWeek::Wednesday, "C", None, vec![ingredient(0.0, 10.0, 0.0)]),
            entry(
                DayOfWeek::Thursday,
                "D",
                Some(chicken),
                vec![ingredient(0.0, 15.0, 0.0)],
            ),
        ];

        let buckets = protein_buckets(&entries);
        assert_eq!(buckets.len(), 3);

        let share_sum: f64 = buckets.iter().map(|b| b.percentage).sum();
        assert!((share_sum - 100.0).abs() < 1e-9);

        // Sorted by grams descending; chicken leads with 45 g over 2 dishes.
        assert_eq!(buckets[0].name, "Pollo");
        assert_eq!(buckets[0].grams, 45.0);
        assert_eq!(buckets[0].dish_count, 2);

        let uncategorized = buckets
            .iter()
            .find(|b| b.protein_type_id.is_none())
            .unwrap();
        assert_eq!(uncategorized.name, UNCATEGORIZED_NAME);
        assert_eq!(uncategorized.grams, 10.0);
    }

    #[test]
    fn test_protein_buckets_all_zero_yields_zero_shares() {
        let entries = vec![
            entry(DayOfWeek::Monday, "A", None, vec![ingredient(100.0, 0.0, 0.0)]),
            entry(DayOfWeek::Tuesday, "B", None, vec![ingredient(50.0, 0.0, 0.0)]),
        ];
        let buckets = protein_buckets(&entries);
        assert!(!buckets.is_empty());
        assert!(buckets.iter().all(|b| b.percentage == 0.0));
    }

    #[test]
    fn test_chart_caps_at_limit_and_reports_excess() {
        let pt = protein_type(10, "Pollo", "#F5A623");
        let entries = vec![
            entry(
                DayOfWeek::Monday,
                "A",
                Some(pt.clone()),
                vec![ingredient(1800.0, 0.0, 0.0)],
            ),
            entry(
                DayOfWeek::Monday,
                "B",
                Some(pt),
                vec![ingredient(700.0, 0.0, 0.0)],
            ),
        ];
        let series = daily_chart_series(&entries, Nutrient::Kcal, 2000.0);
        let monday = &series[0];

        assert_eq!(monday.total, 2500.0);
        assert_eq!(monday.excess, 500.0);
        let stacked: f64 = monday.segments.iter().map(|s| s.value).sum();
        assert!((stacked - 2000.0).abs() < 1e-9);
        assert_eq!(monday.empty_marker, 0.0);
    }

    #[test]
    fn test_chart_empty_day_gets_marker() {
        let series = daily_chart_series(&[], Nutrient::Kcal, 2000.0);
        assert_eq!(series.len(), 7);
        for day in &series {
            assert_eq!(day.total, 0.0);
            assert_eq!(day.excess, 0.0);
            assert_eq!(day.empty_marker, EMPTY_DAY_MARKER);
            assert!(day.segments.is_empty());
        }
    }

    #[test]
    fn test_custom_references_are_honored() {
        let refs = WeeklyReferences {
            kcal: 1000.0,
            ..WeeklyReferences::default()
        };
        assert_eq!(refs.get(Nutrient::Kcal), 1000.0);
        assert_eq!(
            Semaphore::classify(coverage_pct(900.0, refs.get(Nutrient::Kcal))),
            Semaphore::Optimal
        );
    }
}
