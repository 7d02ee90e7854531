//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods.
//! Methods take `&PgPool` when they stand alone, or `&mut PgConnection`
//! when they participate in a caller-owned transaction (everything on the
//! serialized reconciliation path does).

pub mod community_repo;
pub mod login_attempt_repo;
pub mod membership_repo;
pub mod security_report_repo;
pub mod session_repo;
pub mod subscription_repo;
pub mod user_repo;

pub use community_repo::CommunityRepo;
pub use login_attempt_repo::LoginAttemptRepo;
pub use membership_repo::MembershipRepo;
pub use security_report_repo::SecurityReportRepo;
pub use session_repo::SessionRepo;
pub use subscription_repo::SubscriptionRepo;
pub use user_repo::UserRepo;
