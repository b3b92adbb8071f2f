//! Signing key lifecycle
//! Loads the RS256 key pair from PEM files once per process and caches it

use crate::config::AuthConfig;
use jsonwebtoken::{crypto, Algorithm, DecodingKey, EncodingKey};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::OnceCell;

/// Algorithm used for every session token
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

const PROBE_MESSAGE: &[u8] = b"reporacoon-key-probe";

#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("failed to read key file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse key file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: jsonwebtoken::errors::Error,
    },

    #[error("public key {} does not verify signatures from the private key", .path.display())]
    Mismatch { path: PathBuf },

    #[error("signing with key {kid} failed: {source}")]
    Sign {
        kid: String,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

/// Where the key material lives
#[derive(Debug, Clone)]
pub struct KeySettings {
    pub kid: String,
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    /// Verification-only public keys of earlier generations
    pub previous: Vec<(String, PathBuf)>,
}

impl KeySettings {
    pub fn from_config(config: &AuthConfig) -> Self {
        let previous = config
            .previous_keys
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(kid, path)| (kid.trim().to_string(), PathBuf::from(path.trim())))
            .collect();

        Self {
            kid: config.kid.clone(),
            private_key_path: PathBuf::from(&config.private_key_path),
            public_key_path: PathBuf::from(&config.public_key_path),
            previous,
        }
    }
}

/// The loaded signing key plus every key a token may be verified with
pub struct KeyRing {
    kid: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    retired: HashMap<String, DecodingKey>,
}

impl KeyRing {
    /// Identifier of the current signing key
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    /// Select the verification key named by a token header.
    /// Tokens without a `kid` are checked against the current key.
    pub(crate) fn decoding_key(&self, kid: Option<&str>) -> Option<&DecodingKey> {
        match kid {
            None => Some(&self.decoding),
            Some(kid) if kid == self.kid => Some(&self.decoding),
            Some(kid) => self.retired.get(kid),
        }
    }

    pub fn retired_kids(&self) -> impl Iterator<Item = &str> {
        self.retired.keys().map(String::as_str)
    }
}

/// Process-wide provider of the key ring.
///
/// Construct one at startup and share it behind an `Arc`. The first call to
/// [`KeyProvider::keys`] reads and parses the key files; concurrent first
/// callers wait on the same load and all observe the same ring.
pub struct KeyProvider {
    settings: KeySettings,
    ring: OnceCell<KeyRing>,
}

impl KeyProvider {
    pub fn new(settings: KeySettings) -> Self {
        Self {
            settings,
            ring: OnceCell::new(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(KeySettings::from_config(config))
    }

    /// Return the cached key ring, loading it on first use
    pub async fn keys(&self) -> Result<&KeyRing, KeyLoadError> {
        self.ring.get_or_try_init(|| load(&self.settings)).await
    }

    pub fn is_loaded(&self) -> bool {
        self.ring.initialized()
    }
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, KeyLoadError> {
    tokio::fs::read(path).await.map_err(|source| KeyLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_public(path: &Path, pem: &[u8]) -> Result<DecodingKey, KeyLoadError> {
    DecodingKey::from_rsa_pem(pem).map_err(|source| KeyLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

async fn load(settings: &KeySettings) -> Result<KeyRing, KeyLoadError> {
    tracing::debug!(kid = %settings.kid, "Loading signing keys");

    let (private_pem, public_pem) = tokio::try_join!(
        read_pem(&settings.private_key_path),
        read_pem(&settings.public_key_path)
    )?;

    let encoding = EncodingKey::from_rsa_pem(&private_pem).map_err(|source| {
        KeyLoadError::Parse {
            path: settings.private_key_path.clone(),
            source,
        }
    })?;
    let decoding = parse_public(&settings.public_key_path, &public_pem)?;

    // A PEM that parses can still hold a bad or unrelated key; sign once to find out now
    let signature =
        crypto::sign(PROBE_MESSAGE, &encoding, SIGNING_ALGORITHM).map_err(|source| {
            KeyLoadError::Sign {
                kid: settings.kid.clone(),
                source,
            }
        })?;
    match crypto::verify(&signature, PROBE_MESSAGE, &decoding, SIGNING_ALGORITHM) {
        Ok(true) => {}
        Ok(false) => {
            return Err(KeyLoadError::Mismatch {
                path: settings.public_key_path.clone(),
            })
        }
        Err(source) => {
            return Err(KeyLoadError::Parse {
                path: settings.public_key_path.clone(),
                source,
            })
        }
    }

    let mut retired = HashMap::new();
    for (kid, path) in &settings.previous {
        let pem = read_pem(path).await?;
        retired.insert(kid.clone(), parse_public(path, &pem)?);
    }

    tracing::info!(
        kid = %settings.kid,
        retired = retired.len(),
        "Signing keys loaded"
    );

    Ok(KeyRing {
        kid: settings.kid.clone(),
        encoding,
        decoding,
        retired,
    })
}
