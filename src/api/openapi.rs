use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::{
    api::models::{
        AddMembersRequest, CreateGroupRequest, CreatePendingRequest, ErrorResponse,
        GroupMemberView, InviteRequest, InviteView, LoginRequest, LoginResponse,
        RegisterRequest, ReplyInviteRequest, ReplyInviteResponse, SetAdminRequest,
        UpdateGroupRequest, UpdatePendingRequest, UserView,
    },
    core::{
        models::{AppLog, Group, Invite, Pending},
        services::ReconcileReport,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::register,
        super::handlers::login,
        super::handlers::set_admin,
        super::handlers::create_group,
        super::handlers::my_groups,
        super::handlers::get_group,
        super::handlers::update_group,
        super::handlers::delete_group,
        super::handlers::add_members,
        super::handlers::list_members,
        super::handlers::remove_member,
        super::handlers::leave_group,
        super::handlers::send_invite,
        super::handlers::my_invites,
        super::handlers::reply_invite,
        super::handlers::create_pending,
        super::handlers::update_pending,
        super::handlers::delete_pending,
        super::handlers::list_pendings,
        super::handlers::reconcile_group,
        super::handlers::get_app_logs
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        SetAdminRequest,
        CreateGroupRequest,
        UpdateGroupRequest,
        AddMembersRequest,
        InviteRequest,
        ReplyInviteRequest,
        ReplyInviteResponse,
        CreatePendingRequest,
        UpdatePendingRequest,
        UserView,
        GroupMemberView,
        InviteView,
        ErrorResponse,
        Group,
        Invite,
        Pending,
        AppLog,
        ReconcileReport
    )),
    modifiers(&SecurityAddon),
    info(
        title = "Tally API",
        description = "API for shared-expense groups, invitations and pending transactions",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
