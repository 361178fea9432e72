use serde::Serialize;
use thiserror::Error;

/// Field-level detail attached to generic input rejections.
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

/// Error taxonomy for the ledger core. Variants are grouped by how the API
/// layer classifies them: validation (400), authentication plumbing (401),
/// authorization (403), not-found (404), conflict (409) and store/internal
/// failures (500). Not-found on a pending is distinct from an authorization
/// failure; a missing record must never read as success on the
/// ledger-sensitive paths.
#[derive(Error, Debug, Serialize)]
pub enum TallyError {
    // validation

    /// A required field was absent or empty.
    #[error("Missing required field `{0}`")]
    MissingField(String),

    /// `date` did not parse as RFC 3339 or `YYYY-MM-DD`.
    #[error("Invalid date `{0}`")]
    InvalidDate(String),

    /// `money` was absent or not a decimal number within bounds.
    #[error("Invalid money amount")]
    InvalidMoney,

    /// Month/year listing filter outside the calendar domain.
    #[error("Invalid period: month {month}, year {year}")]
    InvalidPeriod { month: u32, year: i32 },

    /// An update request carried none of the mutable fields.
    #[error("No fields to update")]
    NoFieldsToUpdate,

    /// Generic input validation error with field detail.
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),

    // authentication plumbing

    /// Missing or unverifiable bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Login with unknown username or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    // authorization

    /// Caller is not a member of the group they tried to act on.
    #[error("User {0} is not a group member")]
    NotGroupMember(String),

    /// Caller lacks group-admin rights required by the operation.
    #[error("User {0} is not a group admin")]
    NotGroupAdmin(String),

    /// Caller lacks the global operator flag.
    #[error("User {0} is not an operator")]
    NotOperator(String),

    /// Invite target is already in the group, or a duplicate member insert
    /// was attempted.
    #[error("User {0} is already a group member")]
    AlreadyGroupMember(String),

    /// The group's owning admin cannot be removed by anyone.
    #[error("The owning admin cannot be removed from the group")]
    OwningAdminProtected,

    /// The owning admin's exit is deleting the group, not leaving it.
    #[error("The owning admin cannot leave the group")]
    OwningAdminCannotLeave,

    /// The invite being replied to is addressed to somebody else.
    #[error("Invite {0} is not addressed to the caller")]
    InviteNotForUser(String),

    // not-found

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Group {0} not found")]
    GroupNotFound(String),

    #[error("Pending {0} not found")]
    PendingNotFound(String),

    #[error("Member {0} not found in group")]
    MemberNotFound(String),

    #[error("Invite {0} not found")]
    InviteNotFound(String),

    // conflict

    #[error("Username {0} already registered")]
    UsernameTaken(String),

    #[error("Email {0} already registered")]
    EmailTaken(String),

    // store / internal

    /// Underlying persistence failure.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A pending write landed but the aggregate adjustment did not; the
    /// group's balance is drifted until a reconcile pass runs.
    #[error("Ledger inconsistency: {0}")]
    LedgerInconsistency(String),

    /// Structured-log sink failure.
    #[error("Logging error: {0}")]
    LoggingError(String),

    /// Catch-all for unexpected internal failures.
    #[error("Internal error: {0}")]
    InternalError(String),
}
