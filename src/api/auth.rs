use tracing::info;

use crate::client::MwanamamaClient;
use crate::envelope::{AuthSession, SessionRole, normalize_auth_value};
use crate::error::MwanamamaError;
use crate::model::auth::{LoginRequest, RegisterRequest, VerifyRequest};
use crate::storage::{Storage, StorageExt, keys};

impl MwanamamaClient {
    /// POST /auth/login
    pub async fn login(&self, req: &LoginRequest) -> Result<AuthSession, MwanamamaError> {
        let body: serde_json::Value = self.post("/auth/login", req).await?;
        normalize_auth_value(&body)
    }

    /// POST /auth/admin/login
    pub async fn admin_login(&self, req: &LoginRequest) -> Result<AuthSession, MwanamamaError> {
        let body: serde_json::Value = self.post("/auth/admin/login", req).await?;
        let mut session = normalize_auth_value(&body)?;
        session.role = SessionRole::Admin;
        Ok(session)
    }

    /// POST /auth/register
    ///
    /// Registration does not sign in; the account still has to be verified.
    pub async fn register(&self, req: &RegisterRequest) -> Result<(), MwanamamaError> {
        self.post_no_content("/auth/register", req).await
    }

    /// POST /auth/verify
    pub async fn verify(&self, req: &VerifyRequest) -> Result<AuthSession, MwanamamaError> {
        let body: serde_json::Value = self.post("/auth/verify", req).await?;
        normalize_auth_value(&body)
    }
}

/// Persist a session so that [`crate::auth::StoredToken`] picks it up.
pub fn save_session(storage: &dyn Storage, session: &AuthSession) -> Result<(), MwanamamaError> {
    match session.role {
        SessionRole::Admin => {
            storage.set_json(keys::ADMIN_TOKEN, &session.token)?;
            storage.set_json(keys::ADMIN, &session.principal)?;
        }
        SessionRole::Customer => {
            storage.set_json(keys::USER_TOKEN, &session.token)?;
            storage.set_json(keys::USER_DATA, &session.principal)?;
        }
    }
    info!(role = ?session.role, "session saved");
    Ok(())
}

/// Forget the stored session for `role`.
pub fn clear_session(storage: &dyn Storage, role: SessionRole) -> Result<(), MwanamamaError> {
    match role {
        SessionRole::Admin => {
            storage.remove(keys::ADMIN_TOKEN)?;
            storage.remove(keys::ADMIN)?;
        }
        SessionRole::Customer => {
            storage.remove(keys::USER_TOKEN)?;
            storage.remove(keys::USER_DATA)?;
            storage.remove(keys::AUTH_TOKEN)?;
        }
    }
    info!(?role, "session cleared");
    Ok(())
}
