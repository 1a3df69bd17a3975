use serde::Deserialize;
use uuid::Uuid;

use super::repo::NewIngredient;

#[derive(Debug, Deserialize)]
pub struct WorkspaceQuery {
    pub workspace_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CreateProteinTypeRequest {
    pub workspace_id: Uuid,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProteinTypeRequest {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Deserialize)]
pub struct IngredientForm {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    #[serde(default)]
    pub estimated_cost: f64,
}

impl IngredientForm {
    pub fn into_new(self) -> NewIngredient {
        NewIngredient {
            name: self.name,
            quantity: self.quantity,
            unit: self.unit.filter(|u| !u.trim().is_empty()),
            estimated_cost: self.estimated_cost,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDishRequest {
    pub workspace_id: Uuid,
    pub protein_type_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientForm>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDishRequest {
    pub protein_type_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientForm>,
}
