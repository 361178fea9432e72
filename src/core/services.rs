use crate::auth::jwt::{Claims, JwtService};
use crate::constants::{
    ADMIN_GRANTED, BALANCE_RECONCILED, GROUP_CREATED, GROUP_DELETED, GROUP_UPDATED,
    INVITE_ACCEPTED, INVITE_DECLINED, INVITE_SENT, MAX_BANK_LEN, MAX_CONTENT_LEN,
    MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_USERNAME_LEN, MEMBERS_ADDED, MEMBER_LEFT,
    MEMBER_REMOVED, PENDING_CREATED, PENDING_DELETED, PENDING_UPDATED, USER_REGISTERED,
};
use crate::core::errors::{FieldError, TallyError};
use crate::core::models::{AppLog, Group, Invite, Member, Pending, User};
use crate::core::{ledger, membership};
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use chrono::Utc;
use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

/// Outcome of an on-demand balance reconciliation.
#[derive(Serialize, Deserialize, Debug, ToSchema, Clone)]
pub struct ReconcileReport {
    /// Aggregate as stored before the pass.
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub previous: Decimal,
    /// Signed sum recomputed from the group's pendings; the aggregate now
    /// holds this value.
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub recomputed: Decimal,
    pub drifted: bool,
}

/// The single choke point for every domain operation. Each mutation runs
/// input validation, then membership resolution, then the mutation itself,
/// in that order, and records a structured log entry on success.
pub struct TallyService<L: LoggingService, S: Storage> {
    storage: S,
    logging: L,
    jwt_service: JwtService,
}

impl<L: LoggingService, S: Storage> TallyService<L, S> {
    pub fn new(storage: S, logging: L, jwt_secret: String) -> Self {
        TallyService {
            storage,
            logging,
            jwt_service: JwtService::new(jwt_secret),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, TallyError> {
        self.jwt_service.validate_token(token)
    }

    /// Actor resolution for authenticated calls. A token whose subject no
    /// longer resolves (deleted user) is no longer authorized.
    async fn require_user(&self, user_id: Uuid) -> Result<User, TallyError> {
        self.storage
            .get_user(user_id)
            .await?
            .ok_or(TallyError::Unauthorized)
    }

    async fn require_member(&self, group: &Group, user_id: Uuid) -> Result<(), TallyError> {
        if membership::is_member(&self.storage, group.id, user_id).await? {
            Ok(())
        } else {
            Err(TallyError::NotGroupMember(user_id.to_string()))
        }
    }

    async fn require_admin(&self, group: &Group, user_id: Uuid) -> Result<(), TallyError> {
        if membership::is_admin(&self.storage, group.id, user_id).await? {
            Ok(())
        } else {
            Err(TallyError::NotGroupAdmin(user_id.to_string()))
        }
    }

    async fn require_operator(&self, user_id: Uuid) -> Result<User, TallyError> {
        let user = self.require_user(user_id).await?;
        if !user.is_admin {
            return Err(TallyError::NotOperator(user_id.to_string()));
        }
        Ok(user)
    }

    async fn group_by_slug(&self, slug: &str) -> Result<Group, TallyError> {
        self.storage
            .get_group_by_slug(slug)
            .await?
            .ok_or_else(|| TallyError::GroupNotFound(slug.to_string()))
    }

    fn validate_string_input(
        &self,
        field: &str,
        value: &str,
        max_length: usize,
    ) -> Result<(), TallyError> {
        if value.trim().is_empty() {
            return Err(TallyError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("Invalid {}", field),
                    description: format!("{} cannot be empty", field),
                },
            ));
        }
        if value.len() > max_length {
            return Err(TallyError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("{} Too Long", field),
                    description: format!("{} cannot exceed {} characters", field, max_length),
                },
            ));
        }
        if value.chars().any(|c| c.is_control() || "<>{}[]".contains(c)) {
            return Err(TallyError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("Invalid {}", field),
                    description: format!("{} contains invalid characters", field),
                },
            ));
        }
        Ok(())
    }

    // users

    pub async fn register_user(
        &self,
        username: String,
        email: String,
        password: String,
        fullname: String,
    ) -> Result<User, TallyError> {
        self.validate_string_input("username", &username, MAX_USERNAME_LEN)?;
        self.validate_string_input("fullname", &fullname, MAX_NAME_LEN)?;
        if email.is_empty() {
            return Err(TallyError::MissingField("email".to_string()));
        }
        if !email.contains('@') || !email.contains('.') || email.len() < 5 {
            return Err(TallyError::InvalidInput(
                "email".to_string(),
                FieldError {
                    field: "email".to_string(),
                    title: "Invalid email".to_string(),
                    description: format!("{} is not a valid email address", email),
                },
            ));
        }
        if password.is_empty() {
            return Err(TallyError::MissingField("password".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash: String::new(),
            fullname,
            is_admin: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let stored = self.storage.create_user(user, &password).await?;

        self.logging
            .log_action(
                USER_REGISTERED,
                json!({ "user_id": stored.id, "username": stored.username, "email": stored.email }),
                Some(stored.id),
            )
            .await?;
        Ok(stored)
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<String, TallyError> {
        let user = self
            .storage
            .get_user_by_username(username)
            .await?
            .ok_or(TallyError::InvalidCredentials)?;

        if bcrypt::verify(password, &user.password_hash)
            .map_err(|e| TallyError::InternalError(format!("Password verification error: {}", e)))?
        {
            let role = if user.is_admin { "ADMIN" } else { "USER" };
            self.jwt_service.generate_token(&user.id.to_string(), role)
        } else {
            Err(TallyError::InvalidCredentials)
        }
    }

    /// Grants the global operator flag to `username`. Operator-only.
    pub async fn set_admin(&self, username: &str, actor: Uuid) -> Result<User, TallyError> {
        self.require_operator(actor).await?;
        let target = self
            .storage
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| TallyError::UserNotFound(username.to_string()))?;
        let updated = self.storage.set_user_admin(target.id, true).await?;

        self.logging
            .log_action(
                ADMIN_GRANTED,
                json!({ "user_id": updated.id, "username": updated.username }),
                Some(actor),
            )
            .await?;
        Ok(updated)
    }

    // groups

    pub async fn create_group(
        &self,
        name: String,
        description: Option<String>,
        avatar_img: Option<String>,
        actor: Uuid,
    ) -> Result<Group, TallyError> {
        self.validate_string_input("name", &name, MAX_NAME_LEN)?;
        if let Some(ref description) = description {
            self.validate_string_input("description", description, MAX_DESCRIPTION_LEN)?;
        }
        self.require_user(actor).await?;

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            name,
            description,
            avatar_img,
            admin_id: actor,
            base_money: Decimal::ZERO,
            slug: String::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let stored = self.storage.create_group(group).await?;
        self.storage
            .add_member(Member {
                id: Uuid::new_v4(),
                group_id: stored.id,
                user_id: actor,
                is_admin: true,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.logging
            .log_action(
                GROUP_CREATED,
                json!({ "group_id": stored.id, "name": stored.name, "slug": stored.slug }),
                Some(actor),
            )
            .await?;
        Ok(stored)
    }

    pub async fn my_groups(&self, actor: Uuid) -> Result<Vec<Group>, TallyError> {
        self.require_user(actor).await?;
        self.storage.get_user_groups(actor).await
    }

    pub async fn get_group(&self, slug: &str, actor: Uuid) -> Result<Group, TallyError> {
        let group = self.group_by_slug(slug).await?;
        self.require_member(&group, actor).await?;
        Ok(group)
    }

    pub async fn update_group(
        &self,
        slug: &str,
        name: Option<String>,
        description: Option<String>,
        avatar_img: Option<String>,
        actor: Uuid,
    ) -> Result<Group, TallyError> {
        if name.is_none() && description.is_none() && avatar_img.is_none() {
            return Err(TallyError::NoFieldsToUpdate);
        }
        if let Some(ref name) = name {
            self.validate_string_input("name", name, MAX_NAME_LEN)?;
        }
        if let Some(ref description) = description {
            self.validate_string_input("description", description, MAX_DESCRIPTION_LEN)?;
        }
        let group = self.group_by_slug(slug).await?;
        self.require_admin(&group, actor).await?;

        let updated = Group {
            name: name.unwrap_or_else(|| group.name.clone()),
            description: description.or_else(|| group.description.clone()),
            avatar_img: avatar_img.or_else(|| group.avatar_img.clone()),
            ..group
        };
        let stored = self.storage.update_group_metadata(updated).await?;

        self.logging
            .log_action(
                GROUP_UPDATED,
                json!({ "group_id": stored.id, "slug": stored.slug }),
                Some(actor),
            )
            .await?;
        Ok(stored)
    }

    pub async fn delete_group(&self, slug: &str, actor: Uuid) -> Result<(), TallyError> {
        let group = self.group_by_slug(slug).await?;
        self.require_admin(&group, actor).await?;
        self.storage.delete_group(group.id).await?;

        self.logging
            .log_action(
                GROUP_DELETED,
                json!({ "group_id": group.id, "name": group.name }),
                Some(actor),
            )
            .await?;
        Ok(())
    }

    // members

    /// Adds users to the group by username, all-or-nothing checked up
    /// front. Group-admin only; added members start without admin rights.
    pub async fn add_members(
        &self,
        slug: &str,
        usernames: &[String],
        actor: Uuid,
    ) -> Result<Vec<(Member, User)>, TallyError> {
        if usernames.is_empty() {
            return Err(TallyError::MissingField("usernames".to_string()));
        }
        let group = self.group_by_slug(slug).await?;
        self.require_admin(&group, actor).await?;

        let users = try_join_all(usernames.iter().map(|username| async move {
            self.storage
                .get_user_by_username(username)
                .await?
                .ok_or_else(|| TallyError::UserNotFound(username.clone()))
        }))
        .await?;
        for user in &users {
            if membership::is_member(&self.storage, group.id, user.id).await? {
                return Err(TallyError::AlreadyGroupMember(user.username.clone()));
            }
        }

        let now = Utc::now();
        let mut members = Vec::with_capacity(users.len());
        for user in &users {
            let member = self
                .storage
                .add_member(Member {
                    id: Uuid::new_v4(),
                    group_id: group.id,
                    user_id: user.id,
                    is_admin: false,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
            members.push((member, user.clone()));
        }

        self.logging
            .log_action(
                MEMBERS_ADDED,
                json!({
                    "group_id": group.id,
                    "user_ids": users.iter().map(|u| u.id).collect::<Vec<_>>()
                }),
                Some(actor),
            )
            .await?;
        Ok(members)
    }

    pub async fn members_of(
        &self,
        slug: &str,
        actor: Uuid,
    ) -> Result<Vec<(Member, User)>, TallyError> {
        let group = self.group_by_slug(slug).await?;
        self.require_member(&group, actor).await?;
        self.storage.get_group_members(group.id).await
    }

    pub async fn remove_member(
        &self,
        slug: &str,
        target: Uuid,
        actor: Uuid,
    ) -> Result<(), TallyError> {
        let group = self.group_by_slug(slug).await?;
        self.require_admin(&group, actor).await?;
        if membership::is_owning_admin(&group, target) {
            return Err(TallyError::OwningAdminProtected);
        }
        self.storage.remove_member(group.id, target).await?;

        self.logging
            .log_action(
                MEMBER_REMOVED,
                json!({ "group_id": group.id, "user_id": target }),
                Some(actor),
            )
            .await?;
        Ok(())
    }

    pub async fn leave_group(&self, slug: &str, actor: Uuid) -> Result<(), TallyError> {
        let group = self.group_by_slug(slug).await?;
        self.require_member(&group, actor).await?;
        if membership::is_owning_admin(&group, actor) {
            return Err(TallyError::OwningAdminCannotLeave);
        }
        self.storage.remove_member(group.id, actor).await?;

        self.logging
            .log_action(
                MEMBER_LEFT,
                json!({ "group_id": group.id, "user_id": actor }),
                Some(actor),
            )
            .await?;
        Ok(())
    }

    // invites

    /// Issues an invite from a current member to a prospective one. A stale
    /// invite for the same pair is superseded by the new record.
    pub async fn invite(
        &self,
        slug: &str,
        username: &str,
        actor: Uuid,
    ) -> Result<Invite, TallyError> {
        self.validate_string_input("username", username, MAX_USERNAME_LEN)?;
        let group = self.group_by_slug(slug).await?;
        self.require_member(&group, actor).await?;

        let invitee = self
            .storage
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| TallyError::UserNotFound(username.to_string()))?;
        if membership::is_member(&self.storage, group.id, invitee.id).await? {
            return Err(TallyError::AlreadyGroupMember(username.to_string()));
        }

        let now = Utc::now();
        let invite = self
            .storage
            .upsert_invite(Invite {
                id: Uuid::new_v4(),
                user_id: invitee.id,
                group_id: group.id,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.logging
            .log_action(
                INVITE_SENT,
                json!({ "group_id": group.id, "invitee_id": invitee.id, "username": username }),
                Some(actor),
            )
            .await?;
        Ok(invite)
    }

    pub async fn my_invites(&self, actor: Uuid) -> Result<Vec<(Invite, Group)>, TallyError> {
        self.require_user(actor).await?;
        self.storage.get_user_invites(actor).await
    }

    /// Consumes the invite either way; accepting also creates the member
    /// record. Only the invitee may reply.
    pub async fn reply_invite(
        &self,
        invite_id: Uuid,
        accept: bool,
        actor: Uuid,
    ) -> Result<Option<Member>, TallyError> {
        let invite = self
            .storage
            .get_invite(invite_id)
            .await?
            .ok_or_else(|| TallyError::InviteNotFound(invite_id.to_string()))?;
        if invite.user_id != actor {
            return Err(TallyError::InviteNotForUser(invite_id.to_string()));
        }
        let group = self
            .storage
            .get_group(invite.group_id)
            .await?
            .ok_or_else(|| TallyError::GroupNotFound(invite.group_id.to_string()))?;

        self.storage.delete_invite(invite_id).await?;
        if accept {
            let now = Utc::now();
            let member = self
                .storage
                .add_member(Member {
                    id: Uuid::new_v4(),
                    group_id: group.id,
                    user_id: actor,
                    is_admin: false,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
            self.logging
                .log_action(
                    INVITE_ACCEPTED,
                    json!({ "group_id": group.id, "user_id": actor }),
                    Some(actor),
                )
                .await?;
            Ok(Some(member))
        } else {
            self.logging
                .log_action(
                    INVITE_DECLINED,
                    json!({ "group_id": group.id, "user_id": actor }),
                    Some(actor),
                )
                .await?;
            Ok(None)
        }
    }

    // pendings

    pub async fn create_pending(
        &self,
        group_id: Uuid,
        content: Option<String>,
        bank: String,
        date: &str,
        money: Decimal,
        actor: Uuid,
    ) -> Result<Pending, TallyError> {
        self.validate_string_input("bank", &bank, MAX_BANK_LEN)?;
        if let Some(ref content) = content {
            self.validate_string_input("content", content, MAX_CONTENT_LEN)?;
        }
        let date = ledger::parse_date(date)?;
        ledger::validate_money(money)?;

        let group = self
            .storage
            .get_group(group_id)
            .await?
            .ok_or_else(|| TallyError::GroupNotFound(group_id.to_string()))?;
        self.require_member(&group, actor).await?;

        let now = Utc::now();
        let pending = ledger::apply_create(
            &self.storage,
            Pending {
                id: Uuid::new_v4(),
                group_id,
                content,
                bank,
                date,
                money,
                created_at: now,
                updated_at: now,
            },
        )
        .await?;

        self.logging
            .log_action(
                PENDING_CREATED,
                json!({ "pending_id": pending.id, "group_id": group_id, "money": pending.money }),
                Some(actor),
            )
            .await?;
        Ok(pending)
    }

    pub async fn update_pending(
        &self,
        pending_id: Uuid,
        content: Option<String>,
        bank: Option<String>,
        date: Option<String>,
        money: Option<Decimal>,
        actor: Uuid,
    ) -> Result<Pending, TallyError> {
        if content.is_none() && bank.is_none() && date.is_none() && money.is_none() {
            return Err(TallyError::NoFieldsToUpdate);
        }
        if let Some(ref bank) = bank {
            self.validate_string_input("bank", bank, MAX_BANK_LEN)?;
        }
        if let Some(ref content) = content {
            self.validate_string_input("content", content, MAX_CONTENT_LEN)?;
        }
        let date = date.as_deref().map(ledger::parse_date).transpose()?;
        if let Some(money) = money {
            ledger::validate_money(money)?;
        }

        let (current, group) = membership::group_for_pending(&self.storage, pending_id).await?;
        self.require_member(&group, actor).await?;

        let updated = Pending {
            id: current.id,
            group_id: current.group_id,
            content: content.or(current.content),
            bank: bank.unwrap_or(current.bank),
            date: date.unwrap_or(current.date),
            money: money.unwrap_or(current.money),
            created_at: current.created_at,
            updated_at: Utc::now(),
        };
        let previous = ledger::apply_update(&self.storage, updated.clone()).await?;

        self.logging
            .log_action(
                PENDING_UPDATED,
                json!({
                    "pending_id": pending_id,
                    "group_id": group.id,
                    "old_money": previous.money,
                    "new_money": updated.money
                }),
                Some(actor),
            )
            .await?;
        Ok(updated)
    }

    pub async fn delete_pending(&self, pending_id: Uuid, actor: Uuid) -> Result<Pending, TallyError> {
        let (_, group) = membership::group_for_pending(&self.storage, pending_id).await?;
        self.require_member(&group, actor).await?;

        let removed = ledger::apply_delete(&self.storage, pending_id).await?;

        self.logging
            .log_action(
                PENDING_DELETED,
                json!({ "pending_id": pending_id, "group_id": group.id, "money": removed.money }),
                Some(actor),
            )
            .await?;
        Ok(removed)
    }

    pub async fn list_pendings(
        &self,
        group_id: Uuid,
        month: u32,
        year: i32,
        actor: Uuid,
    ) -> Result<Vec<Pending>, TallyError> {
        ledger::validate_period(month, year)?;
        let group = self
            .storage
            .get_group(group_id)
            .await?
            .ok_or_else(|| TallyError::GroupNotFound(group_id.to_string()))?;
        self.require_member(&group, actor).await?;
        self.storage.get_pendings_by_month(group_id, month, year).await
    }

    /// Recomputes the group aggregate from its pendings. Group-admin only.
    pub async fn reconcile_group(
        &self,
        slug: &str,
        actor: Uuid,
    ) -> Result<ReconcileReport, TallyError> {
        let group = self.group_by_slug(slug).await?;
        self.require_admin(&group, actor).await?;

        let (previous, recomputed) = ledger::reconcile(&self.storage, group.id).await?;

        self.logging
            .log_action(
                BALANCE_RECONCILED,
                json!({ "group_id": group.id, "previous": previous, "recomputed": recomputed }),
                Some(actor),
            )
            .await?;
        Ok(ReconcileReport {
            previous,
            recomputed,
            drifted: previous != recomputed,
        })
    }

    // operator surface

    pub async fn app_logs(&self, actor: Uuid) -> Result<Vec<AppLog>, TallyError> {
        self.require_operator(actor).await?;
        self.logging.get_logs().await
    }
}
