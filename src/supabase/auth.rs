use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key is not a JWT (expected three dot-separated segments)")]
    NotAJwt,

    #[error("invalid base64 payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    #[error("invalid claims: {0}")]
    InvalidClaims(#[from] serde_json::Error),
}

/// The claims Supabase puts in its API keys.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyClaims {
    pub role: String,
    #[serde(default, rename = "ref")]
    pub project_ref: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl KeyClaims {
    pub fn is_service_role(&self) -> bool {
        self.role == "service_role"
    }

    pub fn is_expired(&self, now_epoch_secs: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now_epoch_secs)
    }
}

/// Decode the (unverified) claims of a Supabase API key.
///
/// The signature is not checked; the backend does that. This only catches
/// keys pasted into the wrong variable.
pub fn inspect_api_key(key: &str) -> Result<KeyClaims, KeyError> {
    let mut parts = key.trim().split('.');
    let (Some(_header), Some(payload), Some(_sig), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(KeyError::NotAJwt);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))?;

    Ok(serde_json::from_slice(&bytes)?)
}
