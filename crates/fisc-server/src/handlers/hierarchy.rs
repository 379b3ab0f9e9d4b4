//! Department, project and vendor handlers
//!
//! The three middle levels of the hierarchy share one shape (a name and
//! a parent id), so the handlers here are thin wrappers over a few
//! shared helpers. Authorization always resolves the node's chain up to
//! the root budget before acting.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use fisc_core::models::{Department, NodeKind, Project, Vendor};

use crate::events::{broadcast_dashboard_summary, Event};
use crate::{AppError, AppState, AuthUser};

#[derive(Debug, Deserialize)]
pub struct NodeRequest {
    pub name: String,
    /// Parent id, required on create and ignored on update.
    #[serde(default)]
    pub budget_id: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NodeFilter {
    #[serde(default)]
    pub budget_id: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
}

fn validated_name(raw: &str) -> Result<&str, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Name must not be empty"));
    }
    Ok(name)
}

/// Check the caller owns the parent node, then run the create closure
/// and fan out the created entity.
fn create_node<T: serde::Serialize>(
    state: &AppState,
    user: AuthUser,
    kind: NodeKind,
    parent_kind: NodeKind,
    parent_id: Option<i64>,
    name: &str,
    create: impl FnOnce(&str, i64) -> fisc_core::Result<T>,
) -> Result<T, AppError> {
    let parent_id = parent_id.ok_or_else(|| {
        AppError::bad_request(&format!("A parent {} id is required", parent_kind))
    })?;
    state.db.authorize(user.0, parent_kind, parent_id)?;

    let node = create(validated_name(name)?, parent_id)?;

    state.events.broadcast(&Event::entity(
        kind,
        "created",
        serde_json::to_value(&node).unwrap_or_default(),
    ));
    broadcast_dashboard_summary(&state.events, &state.db);
    Ok(node)
}

/// Ownership-checked rename, shared by all three levels.
fn update_node<T: serde::Serialize>(
    state: &AppState,
    user: AuthUser,
    kind: NodeKind,
    id: i64,
    name: &str,
    update: impl FnOnce(i64, &str) -> fisc_core::Result<T>,
) -> Result<T, AppError> {
    state.db.authorize(user.0, kind, id)?;
    let node = update(id, validated_name(name)?)?;

    state.events.broadcast(&Event::entity(
        kind,
        "updated",
        serde_json::to_value(&node).unwrap_or_default(),
    ));
    broadcast_dashboard_summary(&state.events, &state.db);
    Ok(node)
}

/// Ownership-checked delete, shared by all three levels.
fn delete_node(
    state: &AppState,
    user: AuthUser,
    kind: NodeKind,
    id: i64,
    delete: impl FnOnce(i64) -> fisc_core::Result<()>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.authorize(user.0, kind, id)?;
    delete(id)?;

    state
        .events
        .broadcast(&Event::entity(kind, "deleted", serde_json::json!({ "id": id })));
    broadcast_dashboard_summary(&state.events, &state.db);
    Ok(Json(serde_json::json!({ "success": true })))
}

// ========== Departments ==========

/// GET /api/departments?budget_id= - List the caller's departments
pub async fn list_departments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<NodeFilter>,
) -> Result<Json<Vec<Department>>, AppError> {
    Ok(Json(state.db.list_departments(user.0, filter.budget_id)?))
}

/// POST /api/departments - Create a department under an owned budget
pub async fn create_department(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<NodeRequest>,
) -> Result<(StatusCode, Json<Department>), AppError> {
    let node = create_node(
        &state,
        user,
        NodeKind::Department,
        NodeKind::Budget,
        req.budget_id,
        &req.name,
        |name, parent| state.db.create_department(name, parent),
    )?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// GET /api/departments/:id
pub async fn get_department(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Department>, AppError> {
    state.db.authorize(user.0, NodeKind::Department, id)?;
    let node = state
        .db
        .get_department(id)?
        .ok_or_else(|| AppError::not_found("Department not found"))?;
    Ok(Json(node))
}

/// PUT /api/departments/:id
pub async fn update_department(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<NodeRequest>,
) -> Result<Json<Department>, AppError> {
    let node = update_node(&state, user, NodeKind::Department, id, &req.name, |id, name| {
        state.db.update_department(id, name)
    })?;
    Ok(Json(node))
}

/// DELETE /api/departments/:id
pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    delete_node(&state, user, NodeKind::Department, id, |id| {
        state.db.delete_department(id)
    })
}

// ========== Projects ==========

/// GET /api/projects?department_id=
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<NodeFilter>,
) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(state.db.list_projects(user.0, filter.department_id)?))
}

/// POST /api/projects - Create a project under an owned department
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<NodeRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let node = create_node(
        &state,
        user,
        NodeKind::Project,
        NodeKind::Department,
        req.department_id,
        &req.name,
        |name, parent| state.db.create_project(name, parent),
    )?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Project>, AppError> {
    state.db.authorize(user.0, NodeKind::Project, id)?;
    let node = state
        .db
        .get_project(id)?
        .ok_or_else(|| AppError::not_found("Project not found"))?;
    Ok(Json(node))
}

/// PUT /api/projects/:id
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<NodeRequest>,
) -> Result<Json<Project>, AppError> {
    let node = update_node(&state, user, NodeKind::Project, id, &req.name, |id, name| {
        state.db.update_project(id, name)
    })?;
    Ok(Json(node))
}

/// DELETE /api/projects/:id
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    delete_node(&state, user, NodeKind::Project, id, |id| {
        state.db.delete_project(id)
    })
}

// ========== Vendors ==========

/// GET /api/vendors?project_id=
pub async fn list_vendors(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<NodeFilter>,
) -> Result<Json<Vec<Vendor>>, AppError> {
    Ok(Json(state.db.list_vendors(user.0, filter.project_id)?))
}

/// POST /api/vendors - Create a vendor under an owned project
pub async fn create_vendor(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<NodeRequest>,
) -> Result<(StatusCode, Json<Vendor>), AppError> {
    let node = create_node(
        &state,
        user,
        NodeKind::Vendor,
        NodeKind::Project,
        req.project_id,
        &req.name,
        |name, parent| state.db.create_vendor(name, parent),
    )?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// GET /api/vendors/:id
pub async fn get_vendor(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vendor>, AppError> {
    state.db.authorize(user.0, NodeKind::Vendor, id)?;
    let node = state
        .db
        .get_vendor(id)?
        .ok_or_else(|| AppError::not_found("Vendor not found"))?;
    Ok(Json(node))
}

/// PUT /api/vendors/:id
pub async fn update_vendor(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<NodeRequest>,
) -> Result<Json<Vendor>, AppError> {
    let node = update_node(&state, user, NodeKind::Vendor, id, &req.name, |id, name| {
        state.db.update_vendor(id, name)
    })?;
    Ok(Json(node))
}

/// DELETE /api/vendors/:id
pub async fn delete_vendor(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    delete_node(&state, user, NodeKind::Vendor, id, |id| {
        state.db.delete_vendor(id)
    })
}
