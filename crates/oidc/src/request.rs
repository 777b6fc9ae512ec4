//! Authorization request construction: state, scopes, and the redirect URL.

use url::Url;

use crate::error::OidcError;
use crate::pkce::{Challenge, random_token};
use crate::provider::ProviderConfig;
use crate::types::non_empty_string;

const STATE_LENGTH: usize = 16;
const RESPONSE_TYPE: &str = "code";
const CODE_CHALLENGE_METHOD: &str = "S256";

non_empty_string!(
    /// CSRF nonce correlating an authorization request with its callback.
    /// Doubles as the namespace key for the persisted context.
    State,
    "state"
);

impl State {
    pub fn generate() -> Result<Self, OidcError> {
        Self::new(random_token(STATE_LENGTH)?)
    }
}

non_empty_string!(Scope, "scope");

/// Requested scopes. `openid` is always present.
#[derive(Debug, Clone)]
pub struct Scopes(Vec<Scope>);

impl Default for Scopes {
    fn default() -> Self {
        Self(vec![Scope(String::from("openid"))])
    }
}

impl Scopes {
    fn push(&mut self, scope: Scope) {
        self.0.push(scope);
    }

    fn as_query_value(&self) -> String {
        self.0
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One authentication attempt's redirect, with its freshly generated state
/// and PKCE verifier.
///
/// State and challenge are generated exactly once, at construction, and are
/// exposed so the caller can persist them before issuing the redirect.
#[derive(Debug)]
pub struct AuthenticationRequest {
    provider: ProviderConfig,
    redirect_uri: Url,
    scopes: Scopes,
    state: State,
    challenge: Challenge,
}

impl AuthenticationRequest {
    pub fn new(provider: ProviderConfig, redirect_uri: Url) -> Result<Self, OidcError> {
        Ok(Self {
            provider,
            redirect_uri,
            scopes: Scopes::default(),
            state: State::generate()?,
            challenge: Challenge::generate()?,
        })
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// The raw PKCE verifier for this attempt.
    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    pub fn with_scopes<I, T>(mut self, scopes: I) -> Result<Self, OidcError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        for scope in scopes {
            self.scopes.push(Scope::new(scope)?);
        }
        Ok(self)
    }

    /// The authorization endpoint URL to redirect the end user to.
    pub fn uri(&self) -> Url {
        let mut uri = self.provider.authorization_endpoint.clone();
        {
            let mut query = uri.query_pairs_mut();
            query.clear();
            query
                // Authorization code flow keeps tokens away from the browser.
                .append_pair("response_type", RESPONSE_TYPE)
                .append_pair("client_id", self.provider.client_id.as_str())
                .append_pair("redirect_uri", self.redirect_uri.as_str())
                .append_pair("scope", &self.scopes.as_query_value())
                .append_pair("state", self.state.as_str())
                .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD)
                .append_pair("code_challenge", &self.challenge.code_challenge());
        }
        uri
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::provider::{ClientId, ClientSecret};

    fn test_provider() -> ProviderConfig {
        ProviderConfig {
            identifier: None,
            client_id: ClientId::new("client-id").unwrap(),
            client_secret: ClientSecret::new("client-secret").unwrap(),
            authorization_endpoint: Url::parse("https://idp.test/authorize").unwrap(),
            token_endpoint: Url::parse("https://idp.test/token").unwrap(),
            user_info_endpoint: None,
        }
    }

    fn query_map(uri: &Url) -> HashMap<String, String> {
        uri.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_state_is_16_chars() {
        let state = State::generate().unwrap();
        assert_eq!(state.as_str().len(), 16);
        assert!(state.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_uri_carries_expected_parameters() {
        let request =
            AuthenticationRequest::new(test_provider(), Url::parse("https://rp.test/cb").unwrap())
                .unwrap();
        let uri = request.uri();

        assert_eq!(uri.host_str(), Some("idp.test"));
        assert_eq!(uri.path(), "/authorize");

        let query = query_map(&uri);
        assert_eq!(query.len(), 7);
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["client_id"], "client-id");
        assert_eq!(query["redirect_uri"], "https://rp.test/cb");
        assert_eq!(query["scope"], "openid");
        assert_eq!(query["state"], request.state().as_str());
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(query["code_challenge"], request.challenge().code_challenge());
    }

    #[test]
    fn test_with_scopes_appends_to_default() {
        let request =
            AuthenticationRequest::new(test_provider(), Url::parse("https://rp.test/cb").unwrap())
                .unwrap()
                .with_scopes(["profile", "email"])
                .unwrap();

        let query = query_map(&request.uri());
        assert_eq!(query["scope"], "openid profile email");
    }

    #[test]
    fn test_existing_endpoint_query_is_replaced() {
        let mut provider = test_provider();
        provider.authorization_endpoint = Url::parse("https://idp.test/authorize?tenant=leftover").unwrap();

        let request =
            AuthenticationRequest::new(provider, Url::parse("https://rp.test/cb").unwrap()).unwrap();
        let query = query_map(&request.uri());
        assert!(!query.contains_key("tenant"));
    }

    #[test]
    fn test_state_and_challenge_are_stable_across_calls() {
        let request =
            AuthenticationRequest::new(test_provider(), Url::parse("https://rp.test/cb").unwrap())
                .unwrap();
        let first = query_map(&request.uri());
        let second = query_map(&request.uri());
        assert_eq!(first["state"], second["state"]);
        assert_eq!(first["code_challenge"], second["code_challenge"]);
    }
}
