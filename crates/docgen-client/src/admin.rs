use reqwest::Method;
use uuid::Uuid;

use docgen_types::api::{
    ActionResponse, CreateUserRequest, CreateUserResponse, DocumentsResponse, ToggleUserRequest,
    UsersResponse,
};
use docgen_types::models::{DocumentRecord, Stats, User};

use crate::client::{DocgenClient, read_json};
use crate::error::ClientError;
use crate::session::Session;

/// Admin operations, only obtainable for an admin session.
pub struct AdminClient<'a> {
    client: &'a DocgenClient,
    session: &'a Session,
}

impl<'a> AdminClient<'a> {
    pub fn new(client: &'a DocgenClient, session: &'a Session) -> Result<Self, ClientError> {
        if !session.is_admin() {
            return Err(ClientError::NotAdmin);
        }
        Ok(Self { client, session })
    }

    fn is_self(&self, id: Uuid) -> bool {
        self.session.user().id == id
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        let resp = self
            .client
            .request(Method::GET, "/api/admin/users", Some(self.session))
            .send()
            .await?;
        let body: UsersResponse = read_json(resp).await?;
        Ok(body.users)
    }

    pub async fn create_user(&self, req: &CreateUserRequest) -> Result<User, ClientError> {
        let resp = self
            .client
            .request(Method::POST, "/api/admin/users", Some(self.session))
            .json(req)
            .send()
            .await?;
        let body: CreateUserResponse = read_json(resp).await?;
        Ok(body.user)
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<String, ClientError> {
        if self.is_self(id) {
            return Err(ClientError::SelfAction("Cannot delete your own account"));
        }
        let resp = self
            .client
            .request(Method::DELETE, &format!("/api/admin/users/{}", id), Some(self.session))
            .send()
            .await?;
        let body: ActionResponse = read_json(resp).await?;
        Ok(body.message)
    }

    /// Set the account's active flag; callers pass the negation of the current one.
    pub async fn toggle_active(&self, id: Uuid, is_active: bool) -> Result<String, ClientError> {
        if self.is_self(id) {
            return Err(ClientError::SelfAction("Cannot deactivate your own account"));
        }
        let resp = self
            .client
            .request(
                Method::PUT,
                &format!("/api/admin/users/{}/toggle", id),
                Some(self.session),
            )
            .json(&ToggleUserRequest { is_active })
            .send()
            .await?;
        let body: ActionResponse = read_json(resp).await?;
        Ok(body.message)
    }

    /// Generation history across all users, newest first.
    pub async fn list_documents(&self, limit: u32) -> Result<Vec<DocumentRecord>, ClientError> {
        let resp = self
            .client
            .request(Method::GET, "/api/admin/documents", Some(self.session))
            .query(&[("limit", limit)])
            .send()
            .await?;
        let body: DocumentsResponse = read_json(resp).await?;
        Ok(body.documents)
    }

    pub async fn stats(&self) -> Result<Stats, ClientError> {
        let resp = self
            .client
            .request(Method::GET, "/api/admin/stats", Some(self.session))
            .send()
            .await?;
        read_json(resp).await
    }
}
