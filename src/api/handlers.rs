use crate::{
    api::models::*,
    auth::jwt::Claims,
    core::{
        errors::TallyError,
        models::{AppLog, Group, Invite, Pending},
        services::{ReconcileReport, TallyService},
    },
    infrastructure::{logging::in_memory::InMemoryLogging, storage::in_memory::InMemoryStorage},
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
};
use http::header;
use uuid::Uuid;

use std::sync::Arc;

/// Middleware to validate JWT
async fn auth_middleware(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(TallyError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(TallyError::Unauthorized)?;

    let claims = service.validate_token(token)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// The token subject, as the trusted acting user id.
fn actor_id(claims: &Claims) -> Result<Uuid, ApiError> {
    claims.sub.parse().map_err(|_| ApiError(TallyError::Unauthorized))
}

// Define API routes
pub fn api_routes(service: Arc<TallyService<InMemoryLogging, InMemoryStorage>>) -> Router {
    let protected_routes = Router::new()
        .route("/users/set-admin", axum::routing::patch(set_admin))
        .route("/groups", axum::routing::post(create_group))
        .route("/groups", axum::routing::get(my_groups))
        .route("/groups/{slug}", axum::routing::get(get_group))
        .route("/groups/{slug}", axum::routing::put(update_group))
        .route("/groups/{slug}", axum::routing::delete(delete_group))
        .route("/groups/{slug}/members", axum::routing::post(add_members))
        .route("/groups/{slug}/members", axum::routing::get(list_members))
        .route(
            "/groups/{slug}/members/{user_id}",
            axum::routing::delete(remove_member),
        )
        .route("/groups/{slug}/leave", axum::routing::post(leave_group))
        .route("/groups/{slug}/invites", axum::routing::post(send_invite))
        .route("/groups/{slug}/reconcile", axum::routing::post(reconcile_group))
        .route("/invites", axum::routing::get(my_invites))
        .route("/invites/reply", axum::routing::post(reply_invite))
        .route("/pendings", axum::routing::post(create_pending))
        .route("/pendings", axum::routing::get(list_pendings))
        .route("/pendings/{pending_id}", axum::routing::patch(update_pending))
        .route("/pendings/{pending_id}", axum::routing::delete(delete_pending))
        .route("/logs", axum::routing::get(get_app_logs))
        .route_layer(middleware::from_fn_with_state(service.clone(), auth_middleware));

    Router::new()
        .route("/login", axum::routing::post(login))
        .route("/users", axum::routing::post(register)) // Unprotected
        .merge(protected_routes)
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = UserView),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 409, description = "Username or email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn register(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let user = service
        .register_user(req.username, req.email, req.password, req.fullname)
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn login(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = service.authenticate(&req.username, &req.password).await?;
    Ok(Json(LoginResponse { token }))
}

#[utoipa::path(
    patch,
    path = "/api/users/set-admin",
    request_body = SetAdminRequest,
    responses(
        (status = 200, description = "Operator flag granted", body = UserView),
        (status = 403, description = "Caller is not an operator", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn set_admin(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetAdminRequest>,
) -> Result<Json<UserView>, ApiError> {
    let actor = actor_id(&claims)?;
    let user = service.set_admin(&req.username, actor).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    post,
    path = "/api/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created successfully", body = Group),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_group(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let actor = actor_id(&claims)?;
    let group = service
        .create_group(req.name, req.description, req.avatar_img, actor)
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    get,
    path = "/api/groups",
    responses(
        (status = 200, description = "Caller's groups", body = Vec<Group>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn my_groups(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Group>>, ApiError> {
    let actor = actor_id(&claims)?;
    let groups = service.my_groups(actor).await?;
    Ok(Json(groups))
}

#[utoipa::path(
    get,
    path = "/api/groups/{slug}",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 200, description = "Group detail", body = Group),
        (status = 403, description = "Caller is not a member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_group(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<Json<Group>, ApiError> {
    let actor = actor_id(&claims)?;
    let group = service.get_group(&slug, actor).await?;
    Ok(Json(group))
}

#[utoipa::path(
    put,
    path = "/api/groups/{slug}",
    request_body = UpdateGroupRequest,
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 200, description = "Group updated successfully", body = Group),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Caller is not a group admin", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_group(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<Group>, ApiError> {
    let actor = actor_id(&claims)?;
    let group = service
        .update_group(&slug, req.name, req.description, req.avatar_img, actor)
        .await?;
    Ok(Json(group))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{slug}",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 200, description = "Group deleted successfully"),
        (status = 403, description = "Caller is not a group admin", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_group(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = actor_id(&claims)?;
    service.delete_group(&slug, actor).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/members",
    request_body = AddMembersRequest,
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 201, description = "Members added successfully", body = Vec<GroupMemberView>),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Caller is not a group admin", body = ErrorResponse),
        (status = 404, description = "Group or user not found", body = ErrorResponse),
        (status = 409, description = "User already a member", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn add_members(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(req): Json<AddMembersRequest>,
) -> Result<(StatusCode, Json<Vec<GroupMemberView>>), ApiError> {
    let actor = actor_id(&claims)?;
    let members = service.add_members(&slug, &req.usernames, actor).await?;
    let views = members.into_iter().map(GroupMemberView::from).collect();
    Ok((StatusCode::CREATED, Json(views)))
}

#[utoipa::path(
    get,
    path = "/api/groups/{slug}/members",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 200, description = "Member list with user display data", body = Vec<GroupMemberView>),
        (status = 403, description = "Caller is not a member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_members(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<GroupMemberView>>, ApiError> {
    let actor = actor_id(&claims)?;
    let members = service.members_of(&slug, actor).await?;
    let views = members.into_iter().map(GroupMemberView::from).collect();
    Ok(Json(views))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{slug}/members/{user_id}",
    params(
        ("slug" = String, Path, description = "Slug of the group"),
        ("user_id" = String, Path, description = "ID of the member to remove")
    ),
    responses(
        (status = 200, description = "Member removed successfully"),
        (status = 403, description = "Not a group admin, or target is the owning admin", body = ErrorResponse),
        (status = 404, description = "Group or member not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn remove_member(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Path((slug, user_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let actor = actor_id(&claims)?;
    service.remove_member(&slug, user_id, actor).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/leave",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 200, description = "Left the group"),
        (status = 403, description = "Not a member, or the owning admin", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn leave_group(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = actor_id(&claims)?;
    service.leave_group(&slug, actor).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/invites",
    request_body = InviteRequest,
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 201, description = "Invite sent", body = Invite),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Caller is not a member", body = ErrorResponse),
        (status = 404, description = "Group or user not found", body = ErrorResponse),
        (status = 409, description = "User already a member", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn send_invite(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(req): Json<InviteRequest>,
) -> Result<(StatusCode, Json<Invite>), ApiError> {
    let actor = actor_id(&claims)?;
    let invite = service.invite(&slug, &req.username, actor).await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

#[utoipa::path(
    get,
    path = "/api/invites",
    responses(
        (status = 200, description = "Caller's invites with group summary", body = Vec<InviteView>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn my_invites(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<InviteView>>, ApiError> {
    let actor = actor_id(&claims)?;
    let invites = service.my_invites(actor).await?;
    let views = invites.into_iter().map(InviteView::from).collect();
    Ok(Json(views))
}

#[utoipa::path(
    post,
    path = "/api/invites/reply",
    request_body = ReplyInviteRequest,
    responses(
        (status = 200, description = "Invite consumed", body = ReplyInviteResponse),
        (status = 403, description = "Invite addressed to somebody else", body = ErrorResponse),
        (status = 404, description = "Invite or group not found", body = ErrorResponse),
        (status = 409, description = "Already a member", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn reply_invite(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReplyInviteRequest>,
) -> Result<Json<ReplyInviteResponse>, ApiError> {
    let actor = actor_id(&claims)?;
    let member = service.reply_invite(req.invite_id, req.accept, actor).await?;
    Ok(Json(ReplyInviteResponse {
        joined: member.is_some(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/pendings",
    request_body = CreatePendingRequest,
    responses(
        (status = 201, description = "Pending created and balance credited", body = Pending),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Caller is not a member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_pending(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePendingRequest>,
) -> Result<(StatusCode, Json<Pending>), ApiError> {
    let actor = actor_id(&claims)?;
    let pending = service
        .create_pending(req.group_id, req.content, req.bank, &req.date, req.money, actor)
        .await?;
    Ok((StatusCode::CREATED, Json(pending)))
}

#[utoipa::path(
    patch,
    path = "/api/pendings/{pending_id}",
    request_body = UpdatePendingRequest,
    params(
        ("pending_id" = String, Path, description = "ID of the pending")
    ),
    responses(
        (status = 200, description = "Pending updated and balance adjusted", body = Pending),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Caller is not a member", body = ErrorResponse),
        (status = 404, description = "Pending or group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_pending(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Path(pending_id): Path<Uuid>,
    Json(req): Json<UpdatePendingRequest>,
) -> Result<Json<Pending>, ApiError> {
    let actor = actor_id(&claims)?;
    let pending = service
        .update_pending(pending_id, req.content, req.bank, req.date, req.money, actor)
        .await?;
    Ok(Json(pending))
}

#[utoipa::path(
    delete,
    path = "/api/pendings/{pending_id}",
    params(
        ("pending_id" = String, Path, description = "ID of the pending")
    ),
    responses(
        (status = 200, description = "Pending deleted and balance debited", body = Pending),
        (status = 403, description = "Caller is not a member", body = ErrorResponse),
        (status = 404, description = "Pending or group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_pending(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Path(pending_id): Path<Uuid>,
) -> Result<Json<Pending>, ApiError> {
    let actor = actor_id(&claims)?;
    let removed = service.delete_pending(pending_id, actor).await?;
    Ok(Json(removed))
}

#[utoipa::path(
    get,
    path = "/api/pendings",
    params(ListPendingsQuery),
    responses(
        (status = 200, description = "Group pendings for the month, ordered by date", body = Vec<Pending>),
        (status = 400, description = "Invalid period", body = ErrorResponse),
        (status = 403, description = "Caller is not a member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_pendings(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListPendingsQuery>,
) -> Result<Json<Vec<Pending>>, ApiError> {
    let actor = actor_id(&claims)?;
    let pendings = service
        .list_pendings(query.group_id, query.month, query.year, actor)
        .await?;
    Ok(Json(pendings))
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/reconcile",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 200, description = "Balance recomputed from pendings", body = ReconcileReport),
        (status = 403, description = "Caller is not a group admin", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn reconcile_group(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<Json<ReconcileReport>, ApiError> {
    let actor = actor_id(&claims)?;
    let report = service.reconcile_group(&slug, actor).await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/logs",
    responses(
        (status = 200, description = "Operation log entries", body = Vec<AppLog>),
        (status = 403, description = "Caller is not an operator", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_app_logs(
    State(service): State<Arc<TallyService<InMemoryLogging, InMemoryStorage>>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<AppLog>>, ApiError> {
    let actor = actor_id(&claims)?;
    let logs = service.app_logs(actor).await?;
    Ok(Json(logs))
}
