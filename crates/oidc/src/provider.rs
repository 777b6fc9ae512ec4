use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::OidcError;
use crate::types::non_empty_string;

non_empty_string!(
    /// Optional caller-side name for a provider ("google", "corporate-sso").
    /// Never sent to the IdP.
    Identifier,
    "provider identifier"
);

non_empty_string!(ClientId, "client id");

/// OAuth2 client secret, kept out of `Debug` output.
#[derive(Clone)]
pub struct ClientSecret(SecretString);

impl ClientSecret {
    pub fn new(value: impl Into<String>) -> Result<Self, OidcError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(OidcError::EmptyValue("client secret"));
        }
        Ok(Self(SecretString::new(value)))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ClientSecret([REDACTED])")
    }
}

/// One identity provider's client credentials and endpoints, supplied by the
/// caller per authentication attempt.
///
/// The whole record is persisted under the attempt's state value so the
/// callback handler and token exchange can reconstruct it without consulting
/// configuration again.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub identifier: Option<Identifier>,
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub user_info_endpoint: Option<Url>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_secret_debug_is_redacted() {
        let secret = ClientSecret::new("hunter2").unwrap();
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_client_secret_rejects_empty() {
        assert!(matches!(
            ClientSecret::new(""),
            Err(OidcError::EmptyValue("client secret"))
        ));
    }

    #[test]
    fn test_provider_debug_does_not_leak_secret() {
        let provider = ProviderConfig {
            identifier: Some(Identifier::new("acme").unwrap()),
            client_id: ClientId::new("client-id").unwrap(),
            client_secret: ClientSecret::new("client-secret").unwrap(),
            authorization_endpoint: Url::parse("https://idp.test/authorize").unwrap(),
            token_endpoint: Url::parse("https://idp.test/token").unwrap(),
            user_info_endpoint: None,
        };
        assert!(!format!("{provider:?}").contains("client-secret"));
    }
}
