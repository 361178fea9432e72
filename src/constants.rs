//! Operation names recorded in structured logs, and input bounds shared by
//! the validation layer.

pub const USER_REGISTERED: &str = "USER_REGISTERED";
pub const ADMIN_GRANTED: &str = "ADMIN_GRANTED";
pub const GROUP_CREATED: &str = "GROUP_CREATED";
pub const GROUP_UPDATED: &str = "GROUP_UPDATED";
pub const GROUP_DELETED: &str = "GROUP_DELETED";
pub const MEMBERS_ADDED: &str = "MEMBERS_ADDED";
pub const MEMBER_REMOVED: &str = "MEMBER_REMOVED";
pub const MEMBER_LEFT: &str = "MEMBER_LEFT";
pub const INVITE_SENT: &str = "INVITE_SENT";
pub const INVITE_ACCEPTED: &str = "INVITE_ACCEPTED";
pub const INVITE_DECLINED: &str = "INVITE_DECLINED";
pub const PENDING_CREATED: &str = "PENDING_CREATED";
pub const PENDING_UPDATED: &str = "PENDING_UPDATED";
pub const PENDING_DELETED: &str = "PENDING_DELETED";
pub const BALANCE_RECONCILED: &str = "BALANCE_RECONCILED";

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 255;
pub const MAX_CONTENT_LEN: usize = 255;
pub const MAX_BANK_LEN: usize = 64;
pub const MAX_USERNAME_LEN: usize = 32;

/// Absolute bound on a single pending's amount.
pub const MAX_MONEY: i64 = 1_000_000_000;
