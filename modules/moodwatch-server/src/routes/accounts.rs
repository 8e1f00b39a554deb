use axum::{extract::State, http::HeaderMap, Json};
use moodwatch_domains::Account;

use crate::enrich::{enrich_all, RequestOrigin};
use crate::error::Result;
use crate::state::AppState;

pub async fn list_accounts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Account>>> {
    let accounts = Account::find_all(&state.pool).await?;
    let origin = RequestOrigin::from_headers(&headers);
    Ok(Json(enrich_all(&state.media, &origin, accounts).await))
}
