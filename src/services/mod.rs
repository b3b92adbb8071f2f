//! Business logic services layer

pub mod auth_service;
pub mod confirmation_service;
pub mod mailer;

pub use auth_service::{AuthService, SessionGrant};
pub use confirmation_service::{ConfirmationError, ConfirmationTokenService, Redemption};
pub use mailer::{LogMailer, Mailer, MailerError, OutgoingEmail};
