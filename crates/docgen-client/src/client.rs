use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use docgen_types::api::{
    DocumentsResponse, ErrorBody, GenerateRequest, GenerateResponse, LoginRequest, LoginResponse,
    RegisterRequest, TemplatesResponse,
};
use docgen_types::models::DocumentRecord;

use crate::error::ClientError;
use crate::session::{Session, SessionStore};

/// HTTP access to one DocGen server.
#[derive(Debug, Clone)]
pub struct DocgenClient {
    http: reqwest::Client,
    base_url: String,
}

impl DocgenClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        session: Option<&Session>,
    ) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match session {
            Some(session) => builder.bearer_auth(session.token()),
            None => builder,
        }
    }

    /// Exchange credentials for a session and persist it in `store`.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        store: &dyn SessionStore,
    ) -> Result<Session, ClientError> {
        let resp = self
            .request(Method::POST, "/api/auth/login", None)
            .json(&LoginRequest {
                email: email.trim().to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let (_, detail) = error_detail(resp).await;
            warn!("Login failed for {}: {}", email, detail);
            return Err(ClientError::InvalidCredentials(detail));
        }

        let body: LoginResponse = resp.json().await?;
        let session = Session::new(body.access_token, body.user);
        session.persist(store)?;
        info!("Logged in as {}", session.user().email);
        Ok(session)
    }

    /// Self-service sign-up is not offered; nothing is sent.
    pub fn register(&self, _req: &RegisterRequest) -> Result<Session, ClientError> {
        Err(ClientError::RegistrationUnavailable)
    }

    pub async fn list_templates(&self) -> Result<Vec<String>, ClientError> {
        let resp = self.request(Method::GET, "/api/templates", None).send().await?;
        let body: TemplatesResponse = read_json(resp).await?;
        Ok(body.templates)
    }

    pub async fn generate(
        &self,
        session: &Session,
        req: &GenerateRequest,
    ) -> Result<GenerateResponse, ClientError> {
        let resp = self
            .request(Method::POST, "/api/generate-document", Some(session))
            .json(req)
            .send()
            .await?;
        read_json(resp).await
    }

    /// The session owner's documents, newest first.
    pub async fn my_documents(
        &self,
        session: &Session,
        limit: u32,
    ) -> Result<Vec<DocumentRecord>, ClientError> {
        let resp = self
            .request(Method::GET, "/api/documents", Some(session))
            .query(&[("limit", limit)])
            .send()
            .await?;
        let body: DocumentsResponse = read_json(resp).await?;
        Ok(body.documents)
    }
}

/// Decode a 2xx body, or turn the error body into a [`ClientError`].
pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    if resp.status().is_success() {
        return Ok(resp.json().await?);
    }
    let (status, detail) = error_detail(resp).await;
    Err(ClientError::from_status(status, detail))
}

async fn error_detail(resp: Response) -> (u16, String) {
    let status = resp.status();
    let detail = match resp.json::<ErrorBody>().await {
        Ok(body) => body.detail,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };
    (status.as_u16(), detail)
}
