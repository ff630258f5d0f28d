use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Path, Request, State};
use axum::http::request::Parts;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use points_ledger::Ledger;
use points_types::{Amount, Balance, HistoryEntry, UserId};

use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// The `:id` path segment. A non-numeric id is a [`ServerError::BadRequest`].
#[derive(Clone, Copy, Debug)]
pub struct UserPath(pub UserId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserPath {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<u64>::from_request_parts(parts, state).await?;
        Ok(Self(UserId::new(id)))
    }
}

/// A request body holding a bare JSON integer.
#[derive(Clone, Copy, Debug)]
pub struct AmountBody(pub Amount);

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for AmountBody {
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(amount) = Json::<Amount>::from_request(req, state).await?;
        Ok(Self(amount))
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

pub async fn point_handler(
    State(state): State<AppState>,
    UserPath(user): UserPath,
) -> ServerResult<Json<Balance>> {
    let balance = state.ledger.balance(user).await?;
    Ok(Json(balance))
}

pub async fn histories_handler(
    State(state): State<AppState>,
    UserPath(user): UserPath,
) -> ServerResult<Json<Vec<HistoryEntry>>> {
    let entries = state.ledger.history(user).await?;
    tracing::debug!(user_id = %user, count = entries.len(), "history listed");
    Ok(Json(entries))
}

pub async fn charge_handler(
    State(state): State<AppState>,
    UserPath(user): UserPath,
    AmountBody(amount): AmountBody,
) -> ServerResult<Json<Balance>> {
    let balance = state.ledger.charge(user, amount).await?;
    Ok(Json(balance))
}

pub async fn use_handler(
    State(state): State<AppState>,
    UserPath(user): UserPath,
    AmountBody(amount): AmountBody,
) -> ServerResult<Json<Balance>> {
    let balance = state.ledger.use_points(user, amount).await?;
    Ok(Json(balance))
}
