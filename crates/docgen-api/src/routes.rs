use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{any, delete, get, post, put},
};
use serde_json::{Value, json};

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::middleware::{require_admin, require_auth};
use crate::{admin, documents, templates};

/// The full HTTP surface. Static frontend serving is left to the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(health))
        .route("/api", get(index))
        .route("/api/", get(index))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/templates", get(templates::list_templates))
        .route("/api/templates/{id}/fields", get(templates::template_fields))
        .route("/api/{*rest}", any(api_not_found));

    let protected_routes = Router::new()
        .route("/api/generate-document", post(documents::generate_document))
        .route("/api/documents", get(documents::list_documents))
        .route("/api/documents/{id}", get(documents::get_document))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Layers run bottom-up: require_auth resolves the user before require_admin checks it.
    let admin_routes = Router::new()
        .route("/api/admin/users", get(admin::list_users).post(admin::create_user))
        .route("/api/admin/users/{id}", delete(admin::delete_user))
        .route("/api/admin/users/{id}/toggle", put(admin::toggle_user))
        .route("/api/admin/documents", get(admin::list_documents))
        .route("/api/admin/stats", get(admin::stats))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .with_state(state)
}

/// GET /
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "DocGen API is running",
        "api": "/api",
        "email_configured": state.mailer.is_configured(),
    }))
}

/// GET /api and /api/
async fn index() -> Json<Value> {
    Json(json!({
        "message": "DocGen API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": ["/api/auth/login", "/api/auth/register"],
            "templates": ["/api/templates", "/api/templates/{id}/fields"],
            "documents": ["/api/generate-document", "/api/documents"],
            "admin": ["/api/admin/users", "/api/admin/documents", "/api/admin/stats"],
        },
    }))
}

async fn api_not_found() -> ApiError {
    ApiError::NotFound("API route not found".into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use docgen_db::Database;
    use docgen_db::models::NewUser;
    use docgen_types::api::REGISTRATION_UNAVAILABLE;
    use docgen_types::models::Role;
    use docgen_types::schema::Catalog;

    use super::*;
    use crate::auth::{AppStateInner, create_token, hash_password};
    use crate::mailer::RecordingMailer;
    use crate::templates::TemplateStore;

    const SECRET: &str = "router-test-secret";

    struct Harness {
        state: AppState,
        mailer: Arc<RecordingMailer>,
        admin: (Uuid, String),
        user: (Uuid, String),
    }

    fn harness_with(mailer: RecordingMailer) -> Harness {
        let mailer = Arc::new(mailer);
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: SECRET.into(),
            token_ttl: chrono::Duration::hours(1),
            catalog: Catalog::builtin().unwrap(),
            templates: TemplateStore::from_bodies([
                ("nike", "<h1>Order ORDER_NUMBER</h1><p>WHOLE_NAME, PRICE</p>".to_string()),
                ("dhl", "<p>TRACKING_NUMBER</p>".to_string()),
            ]),
            mailer: mailer.clone(),
        });
        let admin = seed(&state, "root@docgen.test", Role::Admin);
        let user = seed(&state, "ola@docgen.test", Role::User);
        Harness {
            state,
            mailer,
            admin,
            user,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingMailer::new())
    }

    fn seed(state: &AppState, email: &str, role: Role) -> (Uuid, String) {
        let id = Uuid::new_v4();
        let hash = hash_password("secret-pw").unwrap();
        state
            .db
            .create_user(&NewUser {
                id,
                email,
                username: None,
                password_hash: &hash,
                role,
            })
            .unwrap();
        let token = create_token(SECRET, id, email, role, chrono::Duration::hours(1)).unwrap();
        (id, token)
    }

    async fn call(
        state: &AppState,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn nike_order() -> Value {
        json!({
            "template": "nike",
            "recipient_email": "client@example.com",
            "full_name": "Ola Nordmann",
            "order_number": "NK-1001",
            "price": "120.00",
        })
    }

    #[tokio::test]
    async fn health_reports_mailer() {
        let h = harness();
        let (status, body) = call(&h.state, Method::GET, "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["email_configured"], true);
    }

    #[tokio::test]
    async fn unknown_api_route_is_json_404() {
        let h = harness();
        let (status, body) = call(&h.state, Method::GET, "/api/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "API route not found");
    }

    #[tokio::test]
    async fn login_flow() {
        let h = harness();
        let (status, body) = call(
            &h.state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "OLA@docgen.test", "password": "secret-pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["user"]["email"], "ola@docgen.test");
        assert!(body["user"].get("password").is_none());

        let (status, body) = call(
            &h.state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "ola@docgen.test", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid email or password");
    }

    #[tokio::test]
    async fn disabled_account_cannot_log_in_or_use_token() {
        let h = harness();
        h.state.db.set_user_active(&h.user.0.to_string(), false).unwrap();

        let (status, _) = call(
            &h.state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "ola@docgen.test", "password": "secret-pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) =
            call(&h.state, Method::GET, "/api/documents", Some(&h.user.1), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], "User account is disabled");
    }

    #[tokio::test]
    async fn registration_is_closed() {
        let h = harness();
        let (status, body) = call(
            &h.state,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"email": "new@docgen.test", "password": "whatever"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["detail"], REGISTRATION_UNAVAILABLE);
    }

    #[tokio::test]
    async fn templates_listing_and_fields() {
        let h = harness();
        let (status, body) = call(&h.state, Method::GET, "/api/templates", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["templates"], json!(["nike", "dhl"]));
        assert_eq!(body["count"], 2);

        let (status, body) =
            call(&h.state, Method::GET, "/api/templates/nike/fields", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fields"].as_array().unwrap().len(), 14);
        assert_eq!(body["fields"][0]["key"], "recipient_email");

        let (status, _) =
            call(&h.state, Method::GET, "/api/templates/ikea/fields", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn generate_requires_token() {
        let h = harness();
        let (status, _) = call(
            &h.state,
            Method::POST,
            "/api/generate-document",
            None,
            Some(nike_order()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(
            &h.state,
            Method::POST,
            "/api/generate-document",
            Some("not.a.jwt"),
            Some(nike_order()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn generate_renders_sends_and_records() {
        let h = harness();
        let (status, body) = call(
            &h.state,
            Method::POST,
            "/api/generate-document",
            Some(&h.user.1),
            Some(nike_order()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Document generated and sent to client@example.com");

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Your Order NK-1001");
        assert_eq!(sent[0].html, "<h1>Order NK-1001</h1><p>Ola Nordmann, $120.00</p>");

        let (status, body) =
            call(&h.state, Method::GET, "/api/documents", Some(&h.user.1), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["documents"][0]["email_sent"], true);

        let id = body["documents"][0]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/documents/{}", id);
        let (status, _) = call(&h.state, Method::GET, &uri, Some(&h.user.1), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&h.state, Method::GET, &uri, Some(&h.admin.1), None).await;
        assert_eq!(status, StatusCode::OK);

        let other = seed(&h.state, "eve@docgen.test", Role::User);
        let (status, _) = call(&h.state, Method::GET, &uri, Some(&other.1), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let user = h.state.db.get_user_by_id(&h.user.0.to_string()).unwrap().unwrap();
        assert_eq!(user.documents_generated, 1);
    }

    #[tokio::test]
    async fn generate_validates_fields() {
        let h = harness();
        let mut order = nike_order();
        order["recipient_email"] = json!("");
        order["price"] = json!("cheap");
        let (status, body) = call(
            &h.state,
            Method::POST,
            "/api/generate-document",
            Some(&h.user.1),
            Some(order),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.contains("is required"));
        assert!(detail.contains("must be a number"));
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn generate_unknown_or_bodiless_template_is_404() {
        let h = harness();
        for template in ["ikea", "apple"] {
            let mut order = nike_order();
            order["template"] = json!(template);
            let (status, _) = call(
                &h.state,
                Method::POST,
                "/api/generate-document",
                Some(&h.user.1),
                Some(order),
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{template}");
        }
    }

    #[tokio::test]
    async fn delivery_failure_is_recorded_and_reported() {
        let h = harness_with(RecordingMailer::failing("connection refused"));
        let (status, body) = call(
            &h.state,
            Method::POST,
            "/api/generate-document",
            Some(&h.user.1),
            Some(nike_order()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["detail"], "Document generated but email failed: connection refused");

        let (_, stats) = call(&h.state, Method::GET, "/api/admin/stats", Some(&h.admin.1), None).await;
        assert_eq!(stats["documents"], json!({"total": 1, "sent": 0, "failed": 1}));

        let (_, docs) =
            call(&h.state, Method::GET, "/api/admin/documents", Some(&h.admin.1), None).await;
        assert_eq!(docs["documents"][0]["email_error"], "connection refused");
    }

    #[tokio::test]
    async fn admin_routes_require_admin() {
        let h = harness();
        for uri in ["/api/admin/users", "/api/admin/documents", "/api/admin/stats"] {
            let (status, body) = call(&h.state, Method::GET, uri, Some(&h.user.1), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(body["detail"], "Admin access required");

            let (status, _) = call(&h.state, Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn admin_user_management() {
        let h = harness();
        let token = Some(h.admin.1.as_str());

        let (status, body) = call(
            &h.state,
            Method::POST,
            "/api/admin/users",
            token,
            Some(json!({"email": "kari@docgen.test", "password": "hunter22"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["username"], "kari");
        assert_eq!(body["user"]["role"], "user");
        let kari = body["user"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &h.state,
            Method::POST,
            "/api/admin/users",
            token,
            Some(json!({"email": "KARI@docgen.test", "password": "hunter22"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(
            &h.state,
            Method::POST,
            "/api/admin/users",
            token,
            Some(json!({"email": "short@docgen.test", "password": "abc"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, body) = call(&h.state, Method::GET, "/api/admin/users", token, None).await;
        assert_eq!(body["count"], 3);

        let toggle = format!("/api/admin/users/{}/toggle", kari);
        let (status, body) =
            call(&h.state, Method::PUT, &toggle, token, Some(json!({"is_active": false}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User deactivated");

        let (_, stats) = call(&h.state, Method::GET, "/api/admin/stats", token, None).await;
        assert_eq!(stats["users"], json!({"total": 3, "active": 2, "inactive": 1}));

        let (status, _) =
            call(&h.state, Method::DELETE, &format!("/api/admin/users/{}", kari), token, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) =
            call(&h.state, Method::DELETE, &format!("/api/admin/users/{}", kari), token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "User not found");
    }

    #[tokio::test]
    async fn admin_cannot_act_on_self() {
        let h = harness();
        let token = Some(h.admin.1.as_str());
        let me = h.admin.0;

        let (status, body) =
            call(&h.state, Method::DELETE, &format!("/api/admin/users/{}", me), token, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], "Cannot delete your own account");

        let (status, body) = call(
            &h.state,
            Method::PUT,
            &format!("/api/admin/users/{}/toggle", me),
            token,
            Some(json!({"is_active": false})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], "Cannot deactivate your own account");

        assert!(h.state.db.get_user_by_id(&me.to_string()).unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn deleted_user_token_is_rejected() {
        let h = harness();
        h.state.db.delete_user(&h.user.0.to_string()).unwrap();
        let (status, body) =
            call(&h.state, Method::GET, "/api/documents", Some(&h.user.1), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "User not found");
    }

    #[tokio::test]
    async fn index_answers_with_and_without_trailing_slash() {
        let h = harness();
        for uri in ["/api", "/api/"] {
            let (status, body) = call(&h.state, Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body["message"], "DocGen API", "{uri}");
        }
    }

    #[tokio::test]
    async fn malformed_requests_get_json_detail() {
        let h = harness();
        let admin = Some(h.admin.1.as_str());

        let (status, body) =
            call(&h.state, Method::DELETE, "/api/admin/users/not-a-uuid", admin, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body["detail"].as_str().unwrap().is_empty());

        let (status, body) = call(
            &h.state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "ola@docgen.test"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("missing field `password`"));

        let (status, body) =
            call(&h.state, Method::GET, "/api/documents?limit=lots", Some(&h.user.1), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().starts_with("Failed to deserialize query string"));

        let (status, body) = call(
            &h.state,
            Method::PUT,
            &format!("/api/admin/users/{}/toggle", h.user.0),
            admin,
            Some(json!({"active": false})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn generate_accepts_numeric_values() {
        let h = harness();
        let mut order = nike_order();
        order["quantity"] = json!(2);
        order["order_number"] = json!(1001);
        order["additional_data"] = json!({"WHOLE_NAME": 7});
        let (status, body) = call(
            &h.state,
            Method::POST,
            "/api/generate-document",
            Some(&h.user.1),
            Some(order),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let sent = h.mailer.sent();
        assert_eq!(sent[0].subject, "Your Order 1001");
        assert_eq!(sent[0].html, "<h1>Order 1001</h1><p>7, $120.00</p>");
    }
}
