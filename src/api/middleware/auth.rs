use sqlx::PgPool;
use tower_sessions::Session;
use uuid::Uuid;

use super::session::SESSION_KEY_MANAGER_ID;
use crate::error::AppError;
use crate::models::ManagerProfile;

/// The authenticated manager identity for the current request
#[derive(Debug, Clone)]
pub struct AuthenticatedManager {
    pub manager_id: Uuid,
}

/// Extracts the authenticated manager id from the session. Mutating
/// handlers call this before touching the database.
pub async fn get_authenticated_manager(
    session: &Session,
) -> Result<AuthenticatedManager, AppError> {
    let manager_id: Uuid = session
        .get(SESSION_KEY_MANAGER_ID)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session error: {}", e)))?
        .ok_or(AppError::Unauthorized)?;

    Ok(AuthenticatedManager { manager_id })
}

/// Loads the full profile for the authenticated manager
pub async fn load_manager(pool: &PgPool, session: &Session) -> Result<ManagerProfile, AppError> {
    let auth = get_authenticated_manager(session).await?;

    ManagerProfile::find_by_id(pool, auth.manager_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Manager profile not found".to_string()))
}

/// Loads the manager and the station they own; most dashboard handlers
/// start here.
pub async fn load_manager_with_station(
    pool: &PgPool,
    session: &Session,
) -> Result<(ManagerProfile, Uuid), AppError> {
    let manager = load_manager(pool, session).await?;
    let station_id = manager.station_id.ok_or(AppError::NoAssociatedStation)?;
    Ok((manager, station_id))
}
