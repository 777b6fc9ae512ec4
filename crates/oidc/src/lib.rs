//! Client side of the OpenID Connect Authorization Code flow with PKCE.
//!
//! Three steps, one [`Authenticator`] call each: build the authorization
//! redirect (`begin_authentication`), validate the IdP's callback
//! (`handle_authorization_code_callback`), and exchange the authorization
//! code for validated tokens (`fetch_tokens_with_authorization_code`).
//! Context survives between the requests in an injected [`StateStore`],
//! namespaced by the attempt's state value.
//!
//! Id tokens are checked structurally (required claims, expiry) but their
//! signature is not verified against the IdP's keys — deployments that need
//! that must verify the raw token against the provider's JWKS themselves.

pub mod authenticator;
pub mod callback;
pub mod error;
pub mod id_token;
pub mod persist;
pub mod pkce;
pub mod provider;
pub mod request;
pub mod store;
pub mod tokens;
pub mod userinfo;

mod types;

pub use authenticator::Authenticator;
pub use callback::{AuthorizationCode, AuthorizationCodeResponse};
pub use error::OidcError;
pub use id_token::UserIdToken;
pub use pkce::Challenge;
pub use provider::{ClientId, ClientSecret, Identifier, ProviderConfig};
pub use request::{AuthenticationRequest, State};
pub use store::{MemoryStateStore, StateStore};
pub use tokens::{AccessToken, RefreshToken, Tokens, TokensResponse};
pub use userinfo::UserInfo;
