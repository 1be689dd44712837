use axum::extract::State;
use axum::http::StatusCode;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::user::SignupRequest;

/// Handler to create user.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<SignupRequest>,
) -> Result<StatusCode> {
    state.accounts.signup(body).await?;

    Ok(StatusCode::CREATED)
}
