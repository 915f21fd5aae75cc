//! Medical groups.

use serde::{Deserialize, Serialize};
use serde_json::json;

use cs_gateway::{ActionContext, HandlerResult};

use crate::shared::store::SportStore;

/// Medical clearance category constraining which groups a student may join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalGroup {
    pub id: i64,
    pub name: String,
    pub description: String,
}

impl MedicalGroup {
    pub fn new(id: i64, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
        }
    }
}

/// `GET /medical_groups`
pub async fn list(store: &SportStore, _ctx: &ActionContext) -> HandlerResult {
    let mut groups: Vec<MedicalGroup> = store.medical_groups.iter().map(|m| m.clone()).collect();
    groups.sort_by_key(|m| m.id);
    Ok(json!(groups
        .iter()
        .map(|m| json!({"id": m.id, "name": m.name, "description": m.description}))
        .collect::<Vec<_>>()))
}
