pub mod alert_repo;
pub mod chat_repo;
pub mod checkin_repo;
pub mod client_repo;
pub mod session_repo;
pub mod tenant_repo;
pub mod user_repo;

pub use alert_repo::AlertRepository;
pub use chat_repo::ChatRepository;
pub use checkin_repo::CheckinRepository;
pub use client_repo::ClientRepository;
pub use session_repo::SessionRepository;
pub use tenant_repo::TenantRepository;
pub use user_repo::UserRepository;
