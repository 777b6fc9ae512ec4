//! Orchestration of the authorization code flow across its three requests.

use tracing::debug;
use url::Url;

use crate::callback::{AuthorizationCodeResponse, CallbackData};
use crate::error::OidcError;
use crate::persist::ContextPersister;
use crate::provider::ProviderConfig;
use crate::request::AuthenticationRequest;
use crate::store::StateStore;
use crate::tokens::{TokenRequestor, TokensResponse};
use crate::userinfo::{self, UserInfo};

/// Entry point for relying-party applications.
///
/// One `Authenticator` serves any number of concurrent users: every attempt
/// is keyed by its own generated state value, so attempts never share state
/// store entries.
///
/// Every operation fails closed and nothing is retried — authorization codes
/// and PKCE verifiers are single-use, and a retry could re-submit a consumed
/// code.
pub struct Authenticator<S> {
    state_store: S,
}

impl<S: StateStore> Authenticator<S> {
    pub fn new(state_store: S) -> Self {
        Self { state_store }
    }

    /// Starts an authentication attempt: generates state and PKCE verifier,
    /// persists {challenge, provider, redirect URI} under the state, and
    /// returns the request whose `uri()` the end user should be redirected
    /// to.
    ///
    /// The redirect URI must be https; anything else is rejected before any
    /// state is persisted.
    pub async fn begin_authentication(
        &self,
        redirect_uri: Url,
        provider: ProviderConfig,
    ) -> Result<AuthenticationRequest, OidcError> {
        if redirect_uri.scheme() != "https" {
            return Err(OidcError::InsecureRedirectUri(redirect_uri));
        }

        let request = AuthenticationRequest::new(provider.clone(), redirect_uri.clone())?;

        let persister = ContextPersister::new(&self.state_store, request.state().clone());
        persister.store_challenge(request.challenge()).await?;
        persister.store_provider(&provider).await?;
        persister.store_redirect_uri(&redirect_uri).await?;

        debug!(state = request.state().as_str(), "authentication attempt started");

        Ok(request)
    }

    /// Validates the IdP's redirect back to us and reconstructs the
    /// attempt's context.
    ///
    /// The context is looked up under the state value extracted from the
    /// callback, not anything held in memory — a forged or replayed state
    /// finds no namespace and the attempt dies with
    /// [`OidcError::MissingPersistedValue`]. The callback's `code_challenge`
    /// must equal the persisted verifier, which ties the callback to the
    /// browser session that started the attempt.
    pub async fn handle_authorization_code_callback(
        &self,
        callback_uri: &Url,
    ) -> Result<AuthorizationCodeResponse, OidcError> {
        let callback = CallbackData::parse(callback_uri)?;

        let persister = ContextPersister::new(&self.state_store, callback.state().clone());

        let challenge = persister.challenge().await?;
        if challenge != callback.challenge {
            return Err(OidcError::ChallengeMismatch);
        }

        let provider = persister.provider().await?;
        let redirect_uri = persister.redirect_uri().await?;

        debug!(state = callback.state().as_str(), "authorization code callback validated");

        Ok(AuthorizationCodeResponse {
            code: callback.code,
            provider,
            redirect_uri,
            challenge,
        })
    }

    /// Exchanges the authorization code for tokens, validating the returned
    /// id token's claims and expiry in the process.
    pub async fn fetch_tokens_with_authorization_code(
        &self,
        response: &AuthorizationCodeResponse,
    ) -> Result<TokensResponse, OidcError> {
        let requestor =
            TokenRequestor::new(&response.provider, &response.redirect_uri, &response.challenge);
        let tokens = requestor.fetch_tokens(&response.code).await?;

        Ok(TokensResponse {
            tokens,
            provider: response.provider.clone(),
        })
    }

    /// Retrieves the user's profile from the provider's userinfo endpoint
    /// using the access token as bearer credential.
    pub async fn fetch_user_info(
        &self,
        tokens_response: &TokensResponse,
    ) -> Result<UserInfo, OidcError> {
        userinfo::request_user_info(
            &tokens_response.provider,
            &tokens_response.tokens.access_token,
        )
        .await
    }
}
