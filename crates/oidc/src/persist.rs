//! Cross-request persistence of one authentication attempt's context,
//! namespaced by its state value.

use url::Url;

use crate::error::OidcError;
use crate::pkce::Challenge;
use crate::provider::{ClientId, ClientSecret, Identifier, ProviderConfig};
use crate::request::State;
use crate::store::StateStore;

/// Logical keys stored under a state namespace. The full store key is
/// `{state}.{logical-key}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey {
    Challenge,
    ProviderIdentifier,
    ProviderClientId,
    ProviderClientSecret,
    ProviderAuthorizationEndpoint,
    ProviderTokenEndpoint,
    ProviderUserInfoEndpoint,
    RedirectUri,
}

impl StateKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Challenge => "challenge",
            Self::ProviderIdentifier => "provider.identifier",
            Self::ProviderClientId => "provider.client-id",
            Self::ProviderClientSecret => "provider.client-secret",
            Self::ProviderAuthorizationEndpoint => "provider.authorization-endpoint",
            Self::ProviderTokenEndpoint => "provider.token-endpoint",
            Self::ProviderUserInfoEndpoint => "provider.user-info-endpoint",
            Self::RedirectUri => "redirect-uri",
        }
    }

    fn with_prefix(self, state: &State) -> String {
        format!("{}.{}", state.as_str(), self.as_str())
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads and writes one attempt's {challenge, provider, redirect URI} under
/// its state namespace.
///
/// Reads reconstruct typed values and fail with
/// [`OidcError::MissingPersistedValue`] when a mandatory field is absent —
/// either the store evicted it or the state value was never issued by us.
pub struct ContextPersister<'a, S: StateStore + ?Sized> {
    store: &'a S,
    state: State,
}

impl<'a, S: StateStore + ?Sized> ContextPersister<'a, S> {
    pub fn new(store: &'a S, state: State) -> Self {
        Self { store, state }
    }

    pub async fn store_challenge(&self, challenge: &Challenge) -> Result<(), OidcError> {
        self.set(StateKey::Challenge, Some(challenge.as_str())).await
    }

    pub async fn challenge(&self) -> Result<Challenge, OidcError> {
        Challenge::new(self.get_required(StateKey::Challenge).await?)
    }

    pub async fn store_provider(&self, provider: &ProviderConfig) -> Result<(), OidcError> {
        self.set(
            StateKey::ProviderIdentifier,
            provider.identifier.as_ref().map(Identifier::as_str),
        )
        .await?;
        self.set(StateKey::ProviderClientId, Some(provider.client_id.as_str()))
            .await?;
        self.set(
            StateKey::ProviderClientSecret,
            Some(provider.client_secret.expose()),
        )
        .await?;
        self.set(
            StateKey::ProviderAuthorizationEndpoint,
            Some(provider.authorization_endpoint.as_str()),
        )
        .await?;
        self.set(
            StateKey::ProviderTokenEndpoint,
            Some(provider.token_endpoint.as_str()),
        )
        .await?;
        self.set(
            StateKey::ProviderUserInfoEndpoint,
            provider.user_info_endpoint.as_ref().map(Url::as_str),
        )
        .await
    }

    pub async fn provider(&self) -> Result<ProviderConfig, OidcError> {
        let identifier = self
            .get(StateKey::ProviderIdentifier)
            .await?
            .map(Identifier::new)
            .transpose()?;
        let client_id = ClientId::new(self.get_required(StateKey::ProviderClientId).await?)?;
        let client_secret =
            ClientSecret::new(self.get_required(StateKey::ProviderClientSecret).await?)?;
        let authorization_endpoint = parse_url(
            StateKey::ProviderAuthorizationEndpoint,
            &self.get_required(StateKey::ProviderAuthorizationEndpoint).await?,
        )?;
        let token_endpoint = parse_url(
            StateKey::ProviderTokenEndpoint,
            &self.get_required(StateKey::ProviderTokenEndpoint).await?,
        )?;
        let user_info_endpoint = match self.get(StateKey::ProviderUserInfoEndpoint).await? {
            Some(value) => Some(parse_url(StateKey::ProviderUserInfoEndpoint, &value)?),
            None => None,
        };

        Ok(ProviderConfig {
            identifier,
            client_id,
            client_secret,
            authorization_endpoint,
            token_endpoint,
            user_info_endpoint,
        })
    }

    pub async fn store_redirect_uri(&self, redirect_uri: &Url) -> Result<(), OidcError> {
        self.set(StateKey::RedirectUri, Some(redirect_uri.as_str()))
            .await
    }

    pub async fn redirect_uri(&self) -> Result<Url, OidcError> {
        parse_url(
            StateKey::RedirectUri,
            &self.get_required(StateKey::RedirectUri).await?,
        )
    }

    async fn get(&self, key: StateKey) -> Result<Option<String>, OidcError> {
        self.store
            .get(&key.with_prefix(&self.state))
            .await
            .map_err(OidcError::StateStore)
    }

    async fn get_required(&self, key: StateKey) -> Result<String, OidcError> {
        self.get(key)
            .await?
            .ok_or(OidcError::MissingPersistedValue(key))
    }

    async fn set(&self, key: StateKey, value: Option<&str>) -> Result<(), OidcError> {
        self.store
            .set(&key.with_prefix(&self.state), value)
            .await
            .map_err(OidcError::StateStore)
    }
}

fn parse_url(key: StateKey, value: &str) -> Result<Url, OidcError> {
    Url::parse(value).map_err(|_| OidcError::InvalidPersistedUri(key))
}
