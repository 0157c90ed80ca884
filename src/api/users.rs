//! User API endpoints, including the organisation-details update workflow.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{created, success, ApiResult};
use crate::errors::{AppError, FieldError};
use crate::ids;
use crate::models::{InitialRegistrationRequest, UpdateOrgDetailsRequest, User, UserResponse};
use crate::AppState;

/// GET /api/users - List all users.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<UserResponse>> {
    let users = state.repo.list_users().await?;
    tracing::info!("Retrieved {} users", users.len());
    success(users.iter().map(UserResponse::from_user).collect())
}

/// GET /api/users/:id - Get a single user.
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<UserResponse> {
    match state.repo.get_user(&id).await? {
        Some(user) => success(UserResponse::from_user(&user)),
        None => Err(AppError::NotFound(format!("User {} not found", id))),
    }
}

/// GET /api/users/external/:external_login_id - Get a user by federated login id.
pub async fn get_user_by_external_login_id(
    State(state): State<AppState>,
    Path(external_login_id): Path<String>,
) -> ApiResult<UserResponse> {
    match state
        .repo
        .get_user_by_external_login_id(&external_login_id)
        .await?
    {
        Some(user) => success(UserResponse::from_user(&user)),
        None => Err(AppError::NotFound(format!(
            "User with external login id {} not found",
            external_login_id
        ))),
    }
}

/// POST /api/users/initial-entry - Register a user on first login with
/// minimal details. Returns the new store-assigned id.
pub async fn register_initial_user(
    State(state): State<AppState>,
    Json(request): Json<InitialRegistrationRequest>,
) -> ApiResult<String> {
    let mut field_errors = Vec::new();
    if request.external_login_id.trim().is_empty() {
        field_errors.push(FieldError::new(
            "externalLoginId",
            "External login id is required.",
        ));
    }
    if request.email.trim().is_empty() {
        field_errors.push(FieldError::new("email", "Email address is required."));
    } else if !request.email.contains('@') {
        field_errors.push(FieldError::new("email", "Invalid email address format."));
    }
    if !field_errors.is_empty() {
        return Err(AppError::Validation(field_errors));
    }

    if state
        .repo
        .get_user_by_external_login_id(&request.external_login_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "A user with the external login id {} already exists",
            request.external_login_id
        )));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        external_login_id: request.external_login_id,
        email: request.email,
        org_details: None,
        roles: None,
        status: Some(request.status),
        hn_ids: None,
        invitations: None,
    };

    state.repo.insert_user(&user).await?;

    tracing::info!(
        "New user registered: {} (id: {})",
        user.external_login_id,
        user.id
    );

    created(user.id)
}

/// PATCH /api/users/:id/org-details - Update a user's organisation details
/// and add a role.
///
/// Overwrites the organisation fields from the payload, enforces the
/// contact-number invariant, mints an organisation id on the first successful
/// update, replaces the stored document, and finally fires the org-created
/// email. The email is best-effort: its failure never rolls back the update.
pub async fn update_org_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateOrgDetailsRequest>,
) -> ApiResult<User> {
    let Some(mut user) = state.repo.get_user(&id).await? else {
        tracing::warn!("User {} not found for organisation details update", id);
        return Err(AppError::NotFound(format!("User {} not found", id)));
    };

    let mut details = user.org_details.take().unwrap_or_default();
    details.apply(&request.org_details);
    user.add_role(request.role);

    let field_errors = details.reconcile_contact();
    if !field_errors.is_empty() {
        tracing::warn!(
            "Contact validation failed for user {}: {} field error(s)",
            id,
            field_errors.len()
        );
        return Err(AppError::Validation(field_errors));
    }

    // Mint the organisation id exactly once; repeated patches keep it stable.
    if details.org_id.as_deref().map_or(true, |v| v.trim().is_empty()) {
        let next = state.repo.next_sequence_value(ids::ORG_ID_SEQUENCE).await?;
        details.org_id = Some(ids::sequenced_id(ids::ORG_ID_PREFIX, next)?);
    }
    user.org_details = Some(details);

    state.repo.replace_user(&id, &user).await?;

    tracing::info!(
        "Organisation details updated for user {}. OrgId: {:?}",
        id,
        user.org_details.as_ref().and_then(|d| d.org_id.as_deref())
    );

    try_send_org_created_email(&state, &user).await;

    success(user)
}

/// DELETE /api/users/:id - Delete a user.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_user(&id).await?;
    tracing::info!("User {} removed", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Fire the org-created email. Failures are logged and swallowed; this is
/// outside the critical path of the update.
async fn try_send_org_created_email(state: &AppState, user: &User) {
    let Some(details) = &user.org_details else {
        tracing::info!(
            "Skipping org-created email for user {}: no organisation details",
            user.id
        );
        return;
    };
    let Some(org_id) = details.org_id.as_deref().filter(|v| !v.trim().is_empty()) else {
        tracing::info!(
            "Skipping org-created email for user {}: no organisation id",
            user.id
        );
        return;
    };
    if user.email.trim().is_empty() {
        tracing::info!(
            "Skipping org-created email for user {}: no email address",
            user.id
        );
        return;
    }

    let org_name = if details.org_name.is_empty() {
        "Your Organisation".to_string()
    } else {
        details.org_name.clone()
    };

    let personalisation = HashMap::from([
        ("orgName".to_string(), org_name),
        ("orgId".to_string(), org_id.to_string()),
        ("fullName".to_string(), details.full_name()),
        (
            "address".to_string(),
            details.org_registered_address.formatted(),
        ),
    ]);

    let sent = state
        .notifier
        .send_email(
            &user.email,
            &state.config.org_created_template_id,
            &personalisation,
        )
        .await;

    if sent {
        tracing::info!("Org-created email sent to {} for user {}", user.email, user.id);
    } else {
        tracing::warn!(
            "Org-created email failed to send to {} for user {}",
            user.email,
            user.id
        );
    }
}
