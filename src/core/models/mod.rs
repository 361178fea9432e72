pub mod audit;
pub mod group;
pub mod invite;
pub mod member;
pub mod pending;
pub mod user;

pub use audit::AppLog;
pub use group::Group;
pub use invite::Invite;
pub use member::Member;
pub use pending::Pending;
pub use user::User;
