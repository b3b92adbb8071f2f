//! Authentication request and response bodies

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::UserResponse;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 100, message = "Password must be 8-100 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by signup and login; the token itself travels in the cookie
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub expires_in: i64,
}

/// Query string of the confirmation link
#[derive(Debug, Deserialize)]
pub struct ConfirmEmailQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmEmailResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_validation() {
        let ok = SignupRequest {
            email: "raccoon@example.com".to_string(),
            password: "trash-panda".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = SignupRequest {
            email: "raccoon".to_string(),
            password: "trash-panda".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let short = SignupRequest {
            email: "raccoon@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(short.validate().is_err());

        let long = SignupRequest {
            email: "raccoon@example.com".to_string(),
            password: "x".repeat(101),
        };
        assert!(long.validate().is_err());
    }
}
