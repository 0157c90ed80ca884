//! Heat network API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{created, success, ApiResult};
use crate::errors::{AppError, FieldError};
use crate::ids;
use crate::models::{CreateHeatNetworkRequest, HeatNetwork};
use crate::AppState;

/// GET /api/heat-networks - List all heat networks.
pub async fn list_heat_networks(State(state): State<AppState>) -> ApiResult<Vec<HeatNetwork>> {
    let heat_networks = state.repo.list_heat_networks().await?;
    tracing::info!("Retrieved {} heat networks", heat_networks.len());
    success(heat_networks)
}

/// GET /api/heat-networks/:id - Get a single heat network.
pub async fn get_heat_network(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<HeatNetwork> {
    match state.repo.get_heat_network(&id).await? {
        Some(heat_network) => success(heat_network),
        None => Err(AppError::NotFound(format!("Heat network {} not found", id))),
    }
}

/// Query string for the membership lookup: a comma-separated list of hn ids.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HnIdsQuery {
    #[serde(default)]
    pub hn_ids: Option<String>,
}

/// GET /api/heat-networks/by-hn-ids?hnIds=a,b - Exact-match membership lookup
/// by externally visible heat network ids.
pub async fn get_heat_networks_by_hn_ids(
    State(state): State<AppState>,
    Query(query): Query<HnIdsQuery>,
) -> ApiResult<Vec<HeatNetwork>> {
    let hn_ids: Vec<String> = query
        .hn_ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    if hn_ids.is_empty() {
        return Err(AppError::BadRequest(
            "Provide at least one heat network id in the hnIds query parameter (e.g. ?hnIds=HN0000001,HN0000002)"
                .to_string(),
        ));
    }

    let heat_networks = state.repo.get_by_hn_ids(&hn_ids).await?;

    if heat_networks.is_empty() {
        tracing::info!("No heat networks found for ids: {}", hn_ids.join(", "));
        return Err(AppError::NotFound(
            "No heat networks found for the given ids".to_string(),
        ));
    }

    success(heat_networks)
}

/// POST /api/heat-networks - Register a new heat network, minting an hn id
/// from the sequence when the request leaves it blank.
pub async fn create_heat_network(
    State(state): State<AppState>,
    Json(request): Json<CreateHeatNetworkRequest>,
) -> ApiResult<HeatNetwork> {
    let mut field_errors = Vec::new();
    if request.location.trim().is_empty() {
        field_errors.push(FieldError::new("location", "Location is required."));
    }
    if request.name.trim().is_empty() {
        field_errors.push(FieldError::new("name", "Name is required."));
    }
    if !field_errors.is_empty() {
        return Err(AppError::Validation(field_errors));
    }

    let hn_id = match request.hn_id.as_deref().map(str::trim) {
        Some(supplied) if !supplied.is_empty() => supplied.to_string(),
        _ => {
            let next = state
                .repo
                .next_sequence_value(ids::HEAT_NETWORK_ID_SEQUENCE)
                .await?;
            let minted = ids::sequenced_id(ids::HEAT_NETWORK_ID_PREFIX, next)?;
            tracing::info!("Generated new heat network id: {}", minted);
            minted
        }
    };

    let heat_network = HeatNetwork {
        id: Uuid::new_v4().to_string(),
        hn_id: Some(hn_id),
        location: request.location,
        name: request.name,
    };

    state.repo.insert_heat_network(&heat_network).await?;

    tracing::info!(
        "New heat network registered: {:?} (id: {})",
        heat_network.hn_id,
        heat_network.id
    );

    created(heat_network)
}

/// DELETE /api/heat-networks/:id - Delete a heat network.
pub async fn delete_heat_network(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_heat_network(&id).await?;
    tracing::info!("Heat network {} removed", id);
    Ok(StatusCode::NO_CONTENT)
}
