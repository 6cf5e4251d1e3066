use tracing::info;

use crate::client::DocgenClient;
use crate::error::ClientError;
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Landing,
    Dashboard(Session),
    Admin(Session),
}

/// Headless model of the frontend: which screen is showing and the session
/// behind it.
pub struct App<S: SessionStore> {
    client: DocgenClient,
    store: S,
    screen: Screen,
}

impl<S: SessionStore> App<S> {
    /// Resume a stored session on the dashboard, or start on the landing page.
    pub fn start(client: DocgenClient, store: S) -> Result<Self, ClientError> {
        let screen = match Session::restore(&store)? {
            Some(session) => Screen::Dashboard(session),
            None => Screen::Landing,
        };
        Ok(Self {
            client,
            store,
            screen,
        })
    }

    pub fn client(&self) -> &DocgenClient {
        &self.client
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.screen {
            Screen::Landing => None,
            Screen::Dashboard(session) | Screen::Admin(session) => Some(session),
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        let session = self.client.login(email, password, &self.store).await?;
        self.screen = Screen::Dashboard(session);
        Ok(())
    }

    pub fn open_admin(&mut self) -> Result<(), ClientError> {
        let session = match &self.screen {
            Screen::Landing => return Err(ClientError::NotSignedIn),
            Screen::Admin(_) => return Ok(()),
            Screen::Dashboard(session) if !session.is_admin() => {
                return Err(ClientError::NotAdmin);
            }
            Screen::Dashboard(session) => session.clone(),
        };
        self.screen = Screen::Admin(session);
        Ok(())
    }

    pub fn close_admin(&mut self) {
        if let Screen::Admin(session) = &self.screen {
            self.screen = Screen::Dashboard(session.clone());
        }
    }

    /// Drop the session and its stored copy, back to the landing page.
    pub fn logout(&mut self) -> Result<(), ClientError> {
        match std::mem::replace(&mut self.screen, Screen::Landing) {
            Screen::Landing => Session::clear(&self.store),
            Screen::Dashboard(session) | Screen::Admin(session) => session.logout(&self.store),
        }
    }

    /// Call after any request fails: an expired session sends the user back
    /// to the landing page.
    pub fn handle_error(&mut self, err: &ClientError) -> Result<(), ClientError> {
        if err.is_auth_failure() {
            info!("Session rejected by server, logging out");
            self.logout()?;
        }
        Ok(())
    }
}
