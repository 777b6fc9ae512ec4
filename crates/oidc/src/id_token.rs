//! Structural and temporal validation of the id token returned by the token
//! endpoint.
//!
//! The signature is NOT verified — only the payload's claims and expiration
//! are checked. A deployment that needs signature verification should verify
//! the token against the IdP's JWKS before trusting it beyond this crate's
//! checks.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use url::Url;

use crate::error::OidcError;
use crate::types::non_empty_string;

non_empty_string!(
    /// `sub` claim: the IdP's stable identifier for the end user.
    SubjectIdentifier,
    "subject identifier"
);

non_empty_string!(Audience, "audience");

/// Claims every id token must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKey {
    IssuerIdentifier,
    SubjectIdentifier,
    Audiences,
    ExpirationTime,
    IssuedTime,
}

impl ClaimKey {
    pub const REQUIRED: [ClaimKey; 5] = [
        ClaimKey::IssuerIdentifier,
        ClaimKey::SubjectIdentifier,
        ClaimKey::Audiences,
        ClaimKey::ExpirationTime,
        ClaimKey::IssuedTime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IssuerIdentifier => "iss",
            Self::SubjectIdentifier => "sub",
            Self::Audiences => "aud",
            Self::ExpirationTime => "exp",
            Self::IssuedTime => "iat",
        }
    }
}

impl std::fmt::Display for ClaimKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `aud` claim, normalized from a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audiences(Vec<Audience>);

impl Audiences {
    fn from_claim(value: &Value) -> Result<Self, OidcError> {
        let raw = match value {
            Value::String(single) => vec![single.clone()],
            Value::Array(many) => many
                .iter()
                .map(|entry| {
                    entry.as_str().map(str::to_string).ok_or_else(|| {
                        OidcError::InvalidIdToken("aud claim array holds a non-string".into())
                    })
                })
                .collect::<Result<_, _>>()?,
            _ => {
                return Err(OidcError::InvalidIdToken(
                    "aud claim is neither a string nor an array of strings".into(),
                ));
            }
        };

        Ok(Self(
            raw.into_iter()
                .map(Audience::new)
                .collect::<Result<_, _>>()?,
        ))
    }

    pub fn as_slice(&self) -> &[Audience] {
        &self.0
    }
}

/// Parsed and validated id token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdToken {
    raw: String,
    issuer: Url,
    subject: SubjectIdentifier,
    audiences: Audiences,
    expires_at: DateTime<Utc>,
    issued_at: DateTime<Utc>,
}

impl UserIdToken {
    /// Decodes the payload segment, checks the required claims, and rejects
    /// tokens that have already expired.
    pub fn parse(token: &str) -> Result<Self, OidcError> {
        Self::parse_at(token, Utc::now())
    }

    pub(crate) fn parse_at(token: &str, now: DateTime<Utc>) -> Result<Self, OidcError> {
        if token.trim().is_empty() {
            return Err(OidcError::InvalidIdToken("token is an empty string".into()));
        }

        let claims = decode_payload(token)?;

        for key in ClaimKey::REQUIRED {
            if !claims.contains_key(key.as_str()) {
                return Err(OidcError::MissingClaim(key));
            }
        }

        let issuer = claim_string(&claims, ClaimKey::IssuerIdentifier)?;
        let issuer = Url::parse(&issuer)
            .map_err(|_| OidcError::InvalidIdToken("iss claim is not a valid URL".into()))?;
        let subject = SubjectIdentifier::new(claim_string(&claims, ClaimKey::SubjectIdentifier)?)?;
        let audiences = Audiences::from_claim(claim(&claims, ClaimKey::Audiences)?)?;
        let expires_at = claim_timestamp(&claims, ClaimKey::ExpirationTime)?;
        let issued_at = claim_timestamp(&claims, ClaimKey::IssuedTime)?;

        // Strict boundary: a token expiring right now is already expired.
        if now >= expires_at {
            return Err(OidcError::IdTokenExpired { expires_at, now });
        }

        Ok(Self {
            raw: token.to_string(),
            issuer,
            subject,
            audiences,
            expires_at,
            issued_at,
        })
    }

    /// The token exactly as the IdP issued it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    pub fn subject(&self) -> &SubjectIdentifier {
        &self.subject
    }

    pub fn audiences(&self) -> &Audiences {
        &self.audiences
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

fn decode_payload(token: &str) -> Result<Map<String, Value>, OidcError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(OidcError::InvalidIdToken(format!(
            "expected 3 dot-separated segments, found {}",
            segments.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD.decode(segments[1]).map_err(|_| {
        OidcError::InvalidIdToken("payload segment is not valid base64url".into())
    })?;

    match serde_json::from_slice(&payload) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(OidcError::InvalidIdToken(
            "payload is not a JSON object".into(),
        )),
        Err(_) => Err(OidcError::InvalidIdToken("payload is not valid JSON".into())),
    }
}

fn claim(claims: &Map<String, Value>, key: ClaimKey) -> Result<&Value, OidcError> {
    claims.get(key.as_str()).ok_or(OidcError::MissingClaim(key))
}

/// String claim; numeric values are accepted and stringified, since some IdPs
/// issue numeric subjects.
fn claim_string(claims: &Map<String, Value>, key: ClaimKey) -> Result<String, OidcError> {
    match claim(claims, key)? {
        Value::String(value) => Ok(value.clone()),
        Value::Number(value) => Ok(value.to_string()),
        _ => Err(OidcError::InvalidIdToken(format!(
            "{key} claim is not a string"
        ))),
    }
}

fn claim_timestamp(claims: &Map<String, Value>, key: ClaimKey) -> Result<DateTime<Utc>, OidcError> {
    let seconds = claim(claims, key)?.as_i64().ok_or_else(|| {
        OidcError::InvalidIdToken(format!("{key} claim is not a unix timestamp"))
    })?;

    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        OidcError::InvalidIdToken(format!("{key} claim is out of timestamp range"))
    })
}
