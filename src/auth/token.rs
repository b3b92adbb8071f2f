//! Session token issuing and verification
//! RS256 JWTs carrying the user's identity and confirmation state

use crate::auth::keys::{KeyLoadError, KeyProvider, SIGNING_ALGORITHM};
use crate::models::user::{SessionUser, User};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

/// Value of both `iss` and `aud`
pub const ISSUER: &str = "reporacoon";
pub const AUDIENCE: &str = "reporacoon";

/// Session lifetime in seconds
pub const SESSION_TTL_SECS: i64 = 3600;

/// Claims as they appear on the wire
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    email: String,
    email_confirmed: bool,
    iat: i64,
    exp: i64,
    iss: String,
    aud: String,
}

/// Claims of a token that passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub subject: Uuid,
    pub email: String,
    pub email_confirmed: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub issuer: String,
    pub audience: String,
}

impl SessionClaims {
    pub fn into_user(self) -> SessionUser {
        SessionUser {
            id: self.subject,
            email: self.email,
            email_confirmed: self.email_confirmed,
        }
    }
}

impl TryFrom<WireClaims> for SessionClaims {
    type Error = VerificationError;

    fn try_from(wire: WireClaims) -> Result<Self, Self::Error> {
        let subject = Uuid::parse_str(&wire.sub).map_err(|_| VerificationError::MalformedClaims)?;

        if wire.email.trim().is_empty() || !wire.email.validate_email() {
            return Err(VerificationError::MalformedClaims);
        }

        if wire.exp <= wire.iat {
            return Err(VerificationError::MalformedClaims);
        }

        let issued_at =
            DateTime::from_timestamp(wire.iat, 0).ok_or(VerificationError::MalformedClaims)?;
        let expires_at =
            DateTime::from_timestamp(wire.exp, 0).ok_or(VerificationError::MalformedClaims)?;

        Ok(Self {
            subject,
            email: wire.email,
            email_confirmed: wire.email_confirmed,
            issued_at,
            expires_at,
            issuer: wire.iss,
            audience: wire.aud,
        })
    }
}

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    Expired,
    /// Signature did not verify, or the header names an unknown key
    BadSignature,
    BadIssuerOrAudience,
    MalformedClaims,
}

impl VerificationError {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationError::Expired => "expired",
            VerificationError::BadSignature => "bad_signature",
            VerificationError::BadIssuerOrAudience => "bad_issuer_or_audience",
            VerificationError::MalformedClaims => "malformed_claims",
        }
    }
}

impl From<&ErrorKind> for VerificationError {
    fn from(kind: &ErrorKind) -> Self {
        match kind {
            ErrorKind::ExpiredSignature => VerificationError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                VerificationError::BadSignature
            }
            ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                VerificationError::BadIssuerOrAudience
            }
            _ => VerificationError::MalformedClaims,
        }
    }
}

#[derive(Debug)]
pub enum Verification {
    Valid(SessionClaims),
    Invalid(VerificationError),
}

/// Signs and checks session tokens with the shared key ring
pub struct TokenCodec {
    keys: Arc<KeyProvider>,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(keys: Arc<KeyProvider>) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Self { keys, validation }
    }

    /// Issue a session token for `user`, valid for [`SESSION_TTL_SECS`]
    pub async fn issue(&self, user: &User) -> Result<String, KeyLoadError> {
        let ring = self.keys.keys().await?;

        let now = Utc::now();
        let claims = WireClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            email_confirmed: user.email_confirmed,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(SESSION_TTL_SECS)).timestamp(),
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
        };

        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(ring.kid().to_string());

        encode(&header, &claims, ring.encoding_key()).map_err(|source| {
            tracing::error!(kid = %ring.kid(), "Failed to sign session token: {:?}", source);
            KeyLoadError::Sign {
                kid: ring.kid().to_string(),
                source,
            }
        })
    }

    /// Check a token and rebuild its claims.
    ///
    /// Only missing key material is an `Err`; a bad token is
    /// `Ok(Verification::Invalid(_))`.
    pub async fn verify(&self, token: &str) -> Result<Verification, KeyLoadError> {
        let ring = self.keys.keys().await?;

        let header = match decode_header(token) {
            Ok(header) => header,
            Err(_) => return Ok(Verification::Invalid(VerificationError::MalformedClaims)),
        };

        let Some(key) = ring.decoding_key(header.kid.as_deref()) else {
            tracing::debug!(kid = ?header.kid, "Token names an unknown key");
            return Ok(Verification::Invalid(VerificationError::BadSignature));
        };

        let data = match decode::<WireClaims>(token, key, &self.validation) {
            Ok(data) => data,
            Err(e) => return Ok(Verification::Invalid(VerificationError::from(e.kind()))),
        };

        if data.claims.exp <= Utc::now().timestamp() {
            return Ok(Verification::Invalid(VerificationError::Expired));
        }

        Ok(match SessionClaims::try_from(data.claims) {
            Ok(claims) => Verification::Valid(claims),
            Err(reason) => Verification::Invalid(reason),
        })
    }
}
