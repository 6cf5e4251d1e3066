use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use axum::{Json, extract::State};
use tracing::{info, warn};

use docgen_types::api::{TemplateFieldsResponse, TemplatesResponse};
use docgen_types::schema::Catalog;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiPath;

/// HTML bodies of the catalog templates, loaded once at startup.
#[derive(Debug, Default)]
pub struct TemplateStore {
    bodies: HashMap<&'static str, String>,
}

impl TemplateStore {
    /// Load `<id>.html` for every catalog template found in `dir`.
    /// Files without a catalog entry are skipped.
    pub fn load(dir: &Path, catalog: &Catalog) -> Result<Self> {
        let mut bodies = HashMap::new();
        if !dir.is_dir() {
            warn!("Templates directory {} not found; no templates available", dir.display());
            return Ok(Self { bodies });
        }

        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("reading templates directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match catalog.template(stem) {
                Some(template) => {
                    let body = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading template {}", path.display()))?;
                    bodies.insert(template.id, body);
                }
                None => warn!("Skipping {}: no catalog entry for '{}'", path.display(), stem),
            }
        }

        for template in catalog.templates() {
            if !bodies.contains_key(template.id) {
                warn!("Template '{}' has no HTML body and will not be offered", template.id);
            }
        }
        info!("Loaded {} templates from {}", bodies.len(), dir.display());
        Ok(Self { bodies })
    }

    pub fn from_bodies<I>(bodies: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        Self {
            bodies: bodies.into_iter().collect(),
        }
    }

    pub fn body(&self, id: &str) -> Option<&str> {
        self.bodies.get(id).map(String::as_str)
    }

    /// Template ids that can be generated, in catalog order.
    pub fn available(&self, catalog: &Catalog) -> Vec<String> {
        catalog
            .templates()
            .filter(|t| self.bodies.contains_key(t.id))
            .map(|t| t.id.to_string())
            .collect()
    }
}

/// GET /api/templates
pub async fn list_templates(State(state): State<AppState>) -> Json<TemplatesResponse> {
    let templates = state.templates.available(&state.catalog);
    Json(TemplatesResponse {
        count: templates.len(),
        templates,
    })
}

/// GET /api/templates/{id}/fields
pub async fn template_fields(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<TemplateFieldsResponse>, ApiError> {
    let template = state
        .catalog
        .template(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Template '{}' not found", id)))?;
    let fields = state
        .catalog
        .fields_for(template.id)
        .map_err(|e| ApiError::NotFound(e.to_string()))?
        .into_iter()
        .copied()
        .collect();

    Ok(Json(TemplateFieldsResponse {
        template: template.id,
        name: template.name,
        fields,
    }))
}
