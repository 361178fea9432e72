use crate::core::errors::TallyError;
use crate::core::models::{Group, Invite, Member, Pending, User};
use crate::infrastructure::storage::{GROUP_POLICY, Storage, USER_POLICY, slugify};
use async_trait::async_trait;
use bcrypt::hash;
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// HashMap-backed store. Secondary indexes (`users_by_username`,
/// `users_by_email`, `groups_by_slug`) map unique keys to primary ids and
/// keep entries for soft-deleted rows so the keys stay reserved. Methods
/// that touch several tables take the locks in field order.
#[derive(Clone)]
pub struct InMemoryStorage {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    users_by_username: Arc<RwLock<HashMap<String, Uuid>>>,
    users_by_email: Arc<RwLock<HashMap<String, Uuid>>>,
    groups: Arc<RwLock<HashMap<Uuid, Group>>>,
    groups_by_slug: Arc<RwLock<HashMap<String, Uuid>>>,
    members: Arc<RwLock<HashMap<(Uuid, Uuid), Member>>>,
    invites: Arc<RwLock<HashMap<Uuid, Invite>>>,
    pendings: Arc<RwLock<HashMap<Uuid, Pending>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage {
            users: Arc::new(RwLock::new(HashMap::new())),
            users_by_username: Arc::new(RwLock::new(HashMap::new())),
            users_by_email: Arc::new(RwLock::new(HashMap::new())),
            groups: Arc::new(RwLock::new(HashMap::new())),
            groups_by_slug: Arc::new(RwLock::new(HashMap::new())),
            members: Arc::new(RwLock::new(HashMap::new())),
            invites: Arc::new(RwLock::new(HashMap::new())),
            pendings: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_user(&self, user: User, password: &str) -> Result<User, TallyError> {
        let mut users = self.users.write().await;
        let mut users_by_username = self.users_by_username.write().await;
        let mut users_by_email = self.users_by_email.write().await;
        if users_by_username.contains_key(&user.username) {
            return Err(TallyError::UsernameTaken(user.username));
        }
        if users_by_email.contains_key(&user.email) {
            return Err(TallyError::EmailTaken(user.email));
        }
        let stored = User {
            password_hash: hash(password, bcrypt::DEFAULT_COST)
                .map_err(|e| TallyError::InternalError(format!("password hashing error: {}", e)))?,
            ..user
        };
        users_by_username.insert(stored.username.clone(), stored.id);
        users_by_email.insert(stored.email.clone(), stored.id);
        users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, TallyError> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).filter(|u| !u.is_deleted()).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, TallyError> {
        let users = self.users.read().await;
        let users_by_username = self.users_by_username.read().await;
        Ok(users_by_username
            .get(username)
            .and_then(|id| users.get(id))
            .filter(|u| !u.is_deleted())
            .cloned())
    }

    async fn set_user_admin(&self, user_id: Uuid, is_admin: bool) -> Result<User, TallyError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id).filter(|u| !u.is_deleted()) {
            Some(user) => {
                user.is_admin = is_admin;
                user.updated_at = Utc::now();
                Ok(user.clone())
            }
            None => Err(TallyError::UserNotFound(user_id.to_string())),
        }
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), TallyError> {
        let mut users = self.users.write().await;
        if !USER_POLICY.soft_delete {
            return users
                .remove(&user_id)
                .map(|_| ())
                .ok_or_else(|| TallyError::UserNotFound(user_id.to_string()));
        }
        match users.get_mut(&user_id).filter(|u| !u.is_deleted()) {
            Some(user) => {
                user.deleted_at = Some(Utc::now());
                user.updated_at = Utc::now();
                Ok(())
            }
            None => Err(TallyError::UserNotFound(user_id.to_string())),
        }
    }

    async fn create_group(&self, group: Group) -> Result<Group, TallyError> {
        let mut groups = self.groups.write().await;
        let mut groups_by_slug = self.groups_by_slug.write().await;
        let stored = match GROUP_POLICY.slug_source {
            Some("name") => {
                let base = slugify(&group.name);
                let mut slug = base.clone();
                let mut suffix = 2;
                while groups_by_slug.contains_key(&slug) {
                    slug = format!("{}-{}", base, suffix);
                    suffix += 1;
                }
                Group { slug, ..group }
            }
            _ => group,
        };
        groups_by_slug.insert(stored.slug.clone(), stored.id);
        groups.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>, TallyError> {
        let groups = self.groups.read().await;
        Ok(groups.get(&group_id).filter(|g| !g.is_deleted()).cloned())
    }

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>, TallyError> {
        let groups = self.groups.read().await;
        let groups_by_slug = self.groups_by_slug.read().await;
        Ok(groups_by_slug
            .get(slug)
            .and_then(|id| groups.get(id))
            .filter(|g| !g.is_deleted())
            .cloned())
    }

    async fn update_group_metadata(&self, group: Group) -> Result<Group, TallyError> {
        let mut groups = self.groups.write().await;
        match groups.get_mut(&group.id).filter(|g| !g.is_deleted()) {
            Some(stored) => {
                stored.name = group.name;
                stored.description = group.description;
                stored.avatar_img = group.avatar_img;
                stored.updated_at = Utc::now();
                Ok(stored.clone())
            }
            None => Err(TallyError::GroupNotFound(group.id.to_string())),
        }
    }

    async fn delete_group(&self, group_id: Uuid) -> Result<(), TallyError> {
        let mut groups = self.groups.write().await;
        if !GROUP_POLICY.soft_delete {
            return groups
                .remove(&group_id)
                .map(|_| ())
                .ok_or_else(|| TallyError::GroupNotFound(group_id.to_string()));
        }
        match groups.get_mut(&group_id).filter(|g| !g.is_deleted()) {
            Some(group) => {
                group.deleted_at = Some(Utc::now());
                group.updated_at = Utc::now();
                Ok(())
            }
            None => Err(TallyError::GroupNotFound(group_id.to_string())),
        }
    }

    async fn get_user_groups(&self, user_id: Uuid) -> Result<Vec<Group>, TallyError> {
        let groups = self.groups.read().await;
        let members = self.members.read().await;
        let mut found: Vec<Group> = members
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| groups.get(&m.group_id))
            .filter(|g| !g.is_deleted())
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn adjust_group_balance(
        &self,
        group_id: Uuid,
        delta: Decimal,
    ) -> Result<Decimal, TallyError> {
        let mut groups = self.groups.write().await;
        match groups.get_mut(&group_id).filter(|g| !g.is_deleted()) {
            Some(group) => {
                group.base_money += delta;
                group.updated_at = Utc::now();
                Ok(group.base_money)
            }
            None => Err(TallyError::GroupNotFound(group_id.to_string())),
        }
    }

    async fn set_group_balance(&self, group_id: Uuid, value: Decimal) -> Result<(), TallyError> {
        let mut groups = self.groups.write().await;
        match groups.get_mut(&group_id).filter(|g| !g.is_deleted()) {
            Some(group) => {
                group.base_money = value;
                group.updated_at = Utc::now();
                Ok(())
            }
            None => Err(TallyError::GroupNotFound(group_id.to_string())),
        }
    }

    async fn add_member(&self, member: Member) -> Result<Member, TallyError> {
        let mut members = self.members.write().await;
        let key = (member.group_id, member.user_id);
        if members.contains_key(&key) {
            return Err(TallyError::AlreadyGroupMember(member.user_id.to_string()));
        }
        members.insert(key, member.clone());
        Ok(member)
    }

    async fn get_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Member>, TallyError> {
        let members = self.members.read().await;
        Ok(members.get(&(group_id, user_id)).cloned())
    }

    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, TallyError> {
        let members = self.members.read().await;
        Ok(members.contains_key(&(group_id, user_id)))
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), TallyError> {
        let mut members = self.members.write().await;
        match members.remove(&(group_id, user_id)) {
            Some(_) => Ok(()),
            None => Err(TallyError::MemberNotFound(user_id.to_string())),
        }
    }

    async fn get_group_members(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<(Member, User)>, TallyError> {
        let users = self.users.read().await;
        let members = self.members.read().await;
        let mut found: Vec<(Member, User)> = members
            .values()
            .filter(|m| m.group_id == group_id)
            .filter_map(|m| users.get(&m.user_id).map(|u| (m.clone(), u.clone())))
            .collect();
        found.sort_by(|a, b| a.0.created_at.cmp(&b.0.created_at));
        Ok(found)
    }

    async fn upsert_invite(&self, invite: Invite) -> Result<Invite, TallyError> {
        let mut invites = self.invites.write().await;
        invites.retain(|_, i| !(i.user_id == invite.user_id && i.group_id == invite.group_id));
        invites.insert(invite.id, invite.clone());
        Ok(invite)
    }

    async fn get_invite(&self, invite_id: Uuid) -> Result<Option<Invite>, TallyError> {
        let invites = self.invites.read().await;
        Ok(invites.get(&invite_id).cloned())
    }

    async fn delete_invite(&self, invite_id: Uuid) -> Result<(), TallyError> {
        let mut invites = self.invites.write().await;
        match invites.remove(&invite_id) {
            Some(_) => Ok(()),
            None => Err(TallyError::InviteNotFound(invite_id.to_string())),
        }
    }

    async fn get_user_invites(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Invite, Group)>, TallyError> {
        let groups = self.groups.read().await;
        let invites = self.invites.read().await;
        let mut found: Vec<(Invite, Group)> = invites
            .values()
            .filter(|i| i.user_id == user_id)
            .filter_map(|i| groups.get(&i.group_id).map(|g| (i.clone(), g.clone())))
            .filter(|(_, g)| !g.is_deleted())
            .collect();
        found.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));
        Ok(found)
    }

    async fn create_pending(&self, pending: Pending) -> Result<Pending, TallyError> {
        let mut pendings = self.pendings.write().await;
        pendings.insert(pending.id, pending.clone());
        Ok(pending)
    }

    async fn get_pending(&self, pending_id: Uuid) -> Result<Option<Pending>, TallyError> {
        let pendings = self.pendings.read().await;
        Ok(pendings.get(&pending_id).cloned())
    }

    async fn update_pending(&self, pending: Pending) -> Result<Pending, TallyError> {
        let mut pendings = self.pendings.write().await;
        match pendings.get_mut(&pending.id) {
            Some(stored) => Ok(std::mem::replace(stored, pending)),
            None => Err(TallyError::PendingNotFound(pending.id.to_string())),
        }
    }

    async fn delete_pending(&self, pending_id: Uuid) -> Result<Pending, TallyError> {
        let mut pendings = self.pendings.write().await;
        pendings
            .remove(&pending_id)
            .ok_or_else(|| TallyError::PendingNotFound(pending_id.to_string()))
    }

    async fn get_group_pendings(&self, group_id: Uuid) -> Result<Vec<Pending>, TallyError> {
        let pendings = self.pendings.read().await;
        Ok(pendings
            .values()
            .filter(|p| p.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn get_pendings_by_month(
        &self,
        group_id: Uuid,
        month: u32,
        year: i32,
    ) -> Result<Vec<Pending>, TallyError> {
        let pendings = self.pendings.read().await;
        let mut found: Vec<Pending> = pendings
            .values()
            .filter(|p| p.group_id == group_id && p.date.month() == month && p.date.year() == year)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(found)
    }
}
