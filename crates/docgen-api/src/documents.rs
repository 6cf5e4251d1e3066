use axum::{
    Extension, Json,
    extract::State,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use docgen_db::models::NewDocument;
use docgen_types::api::{DocumentsResponse, GenerateRequest, GenerateResponse};
use docgen_types::models::DocumentRecord;
use docgen_types::schema::RECIPIENT_FIELD;

use crate::auth::{AppState, with_db};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::mailer::OutgoingEmail;
use crate::middleware::CurrentUser;
use crate::render;

pub const DEFAULT_PAGE: u32 = 100;
pub const MAX_PAGE: u32 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub skip: Option<u32>,
}

impl PageQuery {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE)
    }

    pub fn skip(&self) -> u32 {
        self.skip.unwrap_or(0)
    }
}

/// POST /api/generate-document
pub async fn generate_document(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let template_id = req.template.trim();
    let not_found = || ApiError::NotFound(format!("Template '{}' not found", template_id));

    let template = state.catalog.template(template_id).ok_or_else(not_found)?;
    let body = state.templates.body(template.id).ok_or_else(not_found)?;

    let violations = state
        .catalog
        .validate(template.id, &req.fields)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;
    if !violations.is_empty() {
        let detail = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        warn!("Rejected {} document from {}: {}", template.id, user.email, detail);
        return Err(ApiError::Validation(detail));
    }

    let recipient = req.field(RECIPIENT_FIELD).unwrap_or_default().to_string();
    let order_number = req.field("order_number").unwrap_or_default().to_string();
    let full_name = req.field("full_name").unwrap_or_default().to_string();
    let subject = req
        .field("subject")
        .map(str::to_string)
        .unwrap_or_else(|| format!("Your Order {}", order_number));

    let values = render::placeholders(&req, chrono::Local::now().date_naive());
    let html = render::substitute(body, &values);

    info!("Sending {} document for {} to {}", template.id, user.email, recipient);
    let delivery_error = state
        .mailer
        .send(OutgoingEmail {
            to: recipient.clone(),
            subject,
            html,
        })
        .await
        .err()
        .map(|e| e.to_string());

    let document_id = Uuid::new_v4();
    let template_name = template.id;
    let owner = user.id;
    let (to, order, name, failure) = (
        recipient.clone(),
        order_number,
        full_name,
        delivery_error.clone(),
    );
    let stored = with_db(&state, move |db| {
        db.insert_document(&NewDocument {
            id: document_id,
            user_id: Some(owner),
            template: template_name,
            recipient_email: &to,
            order_number: &order,
            full_name: &name,
            email_sent: failure.is_none(),
            email_error: failure.as_deref(),
        })
    })
    .await;
    if let Err(e) = stored {
        error!("Document {} was not recorded: {}", document_id, e);
    }

    if let Some(reason) = delivery_error {
        warn!("Delivery of {} to {} failed: {}", document_id, recipient, reason);
        return Err(ApiError::Delivery(reason));
    }

    Ok(Json(GenerateResponse {
        success: true,
        document_id,
        message: format!("Document generated and sent to {}", recipient),
        email_sent: true,
    }))
}

/// GET /api/documents
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<DocumentsResponse>, ApiError> {
    let owner = user.id.to_string();
    let (limit, skip) = (page.limit(), page.skip());
    let rows = with_db(&state, move |db| db.list_documents(Some(&owner), limit, skip)).await?;

    let documents: Vec<DocumentRecord> = rows.iter().map(|r| r.to_api()).collect();
    Ok(Json(DocumentsResponse {
        count: documents.len(),
        documents,
    }))
}

/// GET /api/documents/{id}. Admins may read any document.
pub async fn get_document(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DocumentRecord>, ApiError> {
    let doc_id = id.to_string();
    let record = with_db(&state, move |db| db.get_document(&doc_id))
        .await?
        .map(|row| row.to_api())
        .filter(|doc| user.is_admin() || doc.user_id == Some(user.id))
        .ok_or_else(|| ApiError::NotFound("Document not found".into()))?;

    Ok(Json(record))
}
