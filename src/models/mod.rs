pub mod alert;
pub mod chat;
pub mod checkin;
pub mod client;
pub mod from_row;
pub mod tenant;
pub mod user;

pub use alert::{CreateAlert, TrainingAlert};
pub use chat::{
    Conversation, ConversationDetail, ConversationSummary, ConversationType, CreateConversation,
    Message, MessagePage, Pagination, SendMessage,
};
pub use checkin::{DailyCheckin, ReadinessAverage, SaveCheckin};
pub use client::Client;
pub use from_row::FromSqliteRow;
pub use tenant::{CreateTenant, Tenant};
pub use user::{CreateUser, LoginCredentials, User, UserRole, UserSummary};
