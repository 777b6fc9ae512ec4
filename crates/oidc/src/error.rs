use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::callback::CallbackKey;
use crate::id_token::ClaimKey;
use crate::persist::StateKey;

/// Everything that can go wrong between `begin_authentication` and a
/// validated set of tokens. Nothing here is retried internally: an
/// authorization code and a PKCE verifier are single-use, so the caller must
/// restart the flow after any failure.
#[derive(Debug, Error)]
pub enum OidcError {
    /// The redirect URI handed to `begin_authentication` was not https.
    /// Caller bug, not retryable.
    #[error("redirect URI `{0}` must use the https scheme")]
    InsecureRedirectUri(Url),

    /// The operating system RNG failed while generating a state or
    /// challenge value. Fatal environment problem.
    #[error("unable to generate a random token: {0}")]
    RandomSource(String),

    #[error("{0} must not be empty")]
    EmptyValue(&'static str),

    /// The identity provider reported an error on the callback.
    #[error("identity provider returned `{code}`: {description}")]
    IdentityProvider { code: String, description: String },

    #[error("callback is missing required query parameter `{0}`")]
    MissingCallbackParameter(CallbackKey),

    /// The `code_challenge` echoed back on the callback does not equal the
    /// persisted challenge. Treat as an attack, not a transient fault.
    #[error("code challenge from the callback does not match the persisted challenge")]
    ChallengeMismatch,

    /// The persisted context is incomplete: the state value is stale,
    /// forged, or the store evicted it.
    #[error("state store has no value for `{0}`")]
    MissingPersistedValue(StateKey),

    #[error("state store value for `{0}` is not a valid URL")]
    InvalidPersistedUri(StateKey),

    #[error("state store operation failed: {0}")]
    StateStore(#[source] anyhow::Error),

    #[error("request to the {0} endpoint failed")]
    Transport(&'static str, #[source] reqwest::Error),

    #[error("unable to parse JSON response from the {0} endpoint")]
    ResponseParse(&'static str, #[source] serde_json::Error),

    #[error("access_token not found in token endpoint response {body}")]
    AccessTokenNotFound { body: String },

    #[error("id_token not found in token endpoint response {body}")]
    IdTokenNotFound { body: String },

    #[error("invalid user id token: {0}")]
    InvalidIdToken(String),

    #[error("user id token is missing required claim `{0}`")]
    MissingClaim(ClaimKey),

    #[error("user id token expired at {expires_at}, current time {now}")]
    IdTokenExpired {
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("provider has no user info endpoint configured")]
    UserInfoEndpointNotConfigured,

    #[error("userinfo response field `{0}` is missing or invalid")]
    InvalidUserInfoField(&'static str),
}
