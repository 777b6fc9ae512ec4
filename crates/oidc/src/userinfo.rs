//! Userinfo endpoint retrieval with the access token as bearer credential.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::OidcError;
use crate::id_token::SubjectIdentifier;
use crate::provider::ProviderConfig;
use crate::tokens::{AccessToken, REQUEST_TIMEOUT};
use crate::types::non_empty_string;

non_empty_string!(EmailAddress, "email address");

/// Profile claims from the userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub subject: SubjectIdentifier,
    pub full_name: String,
    pub email: EmailAddress,
    pub email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    sub: Option<String>,
    name: Option<String>,
    email: Option<String>,
    // Some IdPs send the string "true" here instead of a boolean.
    email_verified: Option<Value>,
}

impl UserInfo {
    fn from_response(response: UserInfoResponse) -> Result<Self, OidcError> {
        let subject = response.sub.ok_or(OidcError::InvalidUserInfoField("sub"))?;
        let full_name = response.name.ok_or(OidcError::InvalidUserInfoField("name"))?;
        let email = response
            .email
            .ok_or(OidcError::InvalidUserInfoField("email"))?;

        let email_verified = match response.email_verified {
            None => false,
            Some(Value::Bool(verified)) => verified,
            Some(Value::String(raw)) => raw == "true",
            Some(_) => return Err(OidcError::InvalidUserInfoField("email_verified")),
        };

        Ok(Self {
            subject: SubjectIdentifier::new(subject)?,
            full_name,
            email: EmailAddress::new(email)?,
            email_verified,
        })
    }
}

pub(crate) async fn request_user_info(
    provider: &ProviderConfig,
    access_token: &AccessToken,
) -> Result<UserInfo, OidcError> {
    let endpoint = provider
        .user_info_endpoint
        .as_ref()
        .ok_or(OidcError::UserInfoEndpointNotConfigured)?;

    debug!(endpoint = %endpoint, "requesting userinfo");

    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|err| OidcError::Transport("userinfo", err))?;

    let response = client
        .get(endpoint.clone())
        .bearer_auth(access_token.as_str())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|err| OidcError::Transport("userinfo", err))?;

    let body = response
        .text()
        .await
        .map_err(|err| OidcError::Transport("userinfo", err))?;

    debug!(response = body.as_str(), "userinfo endpoint responded");

    let parsed: UserInfoResponse =
        serde_json::from_str(&body).map_err(|err| OidcError::ResponseParse("userinfo", err))?;

    UserInfo::from_response(parsed)
}
