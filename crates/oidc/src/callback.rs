//! Validation of the IdP's redirect back to the relying party.

use std::collections::HashMap;

use url::Url;

use crate::error::OidcError;
use crate::pkce::Challenge;
use crate::provider::ProviderConfig;
use crate::request::State;
use crate::types::non_empty_string;

non_empty_string!(
    /// Single-use credential from the callback, exchanged for tokens.
    AuthorizationCode,
    "authorization code"
);

/// Query parameters the IdP may send to the redirect URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKey {
    Code,
    State,
    Challenge,
    Error,
    ErrorDescription,
}

impl CallbackKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::State => "state",
            Self::Challenge => "code_challenge",
            Self::Error => "error",
            Self::ErrorDescription => "error_description",
        }
    }
}

impl std::fmt::Display for CallbackKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication error codes defined by OpenID Connect Core 1.0 §3.1.2.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationErrorCode {
    InvalidRequest,
    InteractionRequired,
    LoginRequired,
    AccountSelectionRequired,
    ConsentRequired,
    InvalidRequestUri,
    InvalidRequestObject,
    RequestNotSupported,
    RequestUriNotSupported,
    RegistrationNotSupported,
}

impl AuthenticationErrorCode {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "invalid_request" => Some(Self::InvalidRequest),
            "interaction_required" => Some(Self::InteractionRequired),
            "login_required" => Some(Self::LoginRequired),
            "account_selection_required" => Some(Self::AccountSelectionRequired),
            "consent_required" => Some(Self::ConsentRequired),
            "invalid_request_uri" => Some(Self::InvalidRequestUri),
            "invalid_request_object" => Some(Self::InvalidRequestObject),
            "request_not_supported" => Some(Self::RequestNotSupported),
            "request_uri_not_supported" => Some(Self::RequestUriNotSupported),
            "registration_not_supported" => Some(Self::RegistrationNotSupported),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::InvalidRequest => {
                "The request is missing a required parameter, includes an invalid parameter value, includes a parameter more than once, or is otherwise malformed."
            }
            Self::InteractionRequired => {
                "The Authorization Server requires End-User interaction of some form to proceed. This error MAY be returned when the prompt parameter value in the Authentication Request is none, but the Authentication Request cannot be completed without displaying a user interface for End-User interaction."
            }
            Self::LoginRequired => {
                "The Authorization Server requires End-User authentication. This error MAY be returned when the prompt parameter value in the Authentication Request is none, but the Authentication Request cannot be completed without displaying a user interface for End-User authentication."
            }
            Self::AccountSelectionRequired => {
                "The End-User is REQUIRED to select a session at the Authorization Server. The End-User MAY be authenticated at the Authorization Server with different associated accounts, but the End-User did not select a session. This error MAY be returned when the prompt parameter value in the Authentication Request is none, but the Authentication Request cannot be completed without displaying a user interface to prompt for a session to use."
            }
            Self::ConsentRequired => {
                "The Authorization Server requires End-User consent. This error MAY be returned when the prompt parameter value in the Authentication Request is none, but the Authentication Request cannot be completed without displaying a user interface for End-User consent."
            }
            Self::InvalidRequestUri => {
                "The request_uri in the Authorization Request returns an error or contains invalid data."
            }
            Self::InvalidRequestObject => {
                "The request parameter contains an invalid Request Object."
            }
            Self::RequestNotSupported => {
                "The OP does not support use of the request parameter."
            }
            Self::RequestUriNotSupported => {
                "The OP does not support use of the request_uri parameter."
            }
            Self::RegistrationNotSupported => {
                "The OP does not support use of the registration parameter."
            }
        }
    }
}

fn describe_error(code: &str, supplied: Option<String>) -> String {
    supplied.unwrap_or_else(|| match AuthenticationErrorCode::parse(code) {
        Some(known) => known.description().to_string(),
        None => format!("An unknown error code {code} was sent with the authentication request."),
    })
}

/// Parsed callback query.
///
/// Checks run in protocol order: an IdP-reported `error` wins over missing
/// parameters, since an error response legitimately omits `code`.
#[derive(Debug)]
pub struct CallbackData {
    pub(crate) code: AuthorizationCode,
    pub(crate) state: State,
    pub(crate) challenge: Challenge,
}

impl CallbackData {
    pub fn parse(callback_uri: &Url) -> Result<Self, OidcError> {
        let params: HashMap<String, String> = callback_uri.query_pairs().into_owned().collect();
        let find = |key: CallbackKey| params.get(key.as_str()).cloned();

        if let Some(code) = find(CallbackKey::Error) {
            let description = describe_error(&code, find(CallbackKey::ErrorDescription));
            return Err(OidcError::IdentityProvider { code, description });
        }

        let code = find(CallbackKey::Code)
            .ok_or(OidcError::MissingCallbackParameter(CallbackKey::Code))?;
        let state = find(CallbackKey::State)
            .ok_or(OidcError::MissingCallbackParameter(CallbackKey::State))?;
        let challenge = find(CallbackKey::Challenge)
            .ok_or(OidcError::MissingCallbackParameter(CallbackKey::Challenge))?;

        Ok(Self {
            code: AuthorizationCode::new(code)?,
            state: State::new(state)?,
            challenge: Challenge::new(challenge)?,
        })
    }

    pub fn code(&self) -> &AuthorizationCode {
        &self.code
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }
}

/// Validated, reconstructed context for one callback; input to the token
/// exchange.
#[derive(Debug)]
pub struct AuthorizationCodeResponse {
    pub code: AuthorizationCode,
    pub provider: ProviderConfig,
    pub redirect_uri: Url,
    pub challenge: Challenge,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback_url(query: &str) -> Url {
        Url::parse(&format!("https://rp.test/cb?{query}")).unwrap()
    }

    #[test]
    fn test_parses_all_three_parameters() {
        let data = CallbackData::parse(&callback_url(
            "code=auth-code&state=state-value&code_challenge=verifier-value",
        ))
        .unwrap();

        assert_eq!(data.code().as_str(), "auth-code");
        assert_eq!(data.state().as_str(), "state-value");
        assert_eq!(data.challenge().as_str(), "verifier-value");
    }

    #[test]
    fn test_error_wins_over_missing_parameters() {
        // No code at all; the IdP error must be reported, not the missing code.
        let result = CallbackData::parse(&callback_url("error=registration_not_supported&state=x"));

        match result {
            Err(OidcError::IdentityProvider { code, description }) => {
                assert_eq!(code, "registration_not_supported");
                assert_eq!(
                    description,
                    "The OP does not support use of the registration parameter."
                );
            }
            other => panic!("expected IdentityProvider error, got {other:?}"),
        }
    }

    #[test]
    fn test_supplied_error_description_is_preferred() {
        let result = CallbackData::parse(&callback_url(
            "error=login_required&error_description=session+timed+out",
        ));

        match result {
            Err(OidcError::IdentityProvider { description, .. }) => {
                assert_eq!(description, "session timed out");
            }
            other => panic!("expected IdentityProvider error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_error_code_gets_generic_description() {
        let result = CallbackData::parse(&callback_url("error=tea_time"));

        match result {
            Err(OidcError::IdentityProvider { code, description }) => {
                assert_eq!(code, "tea_time");
                assert!(description.contains("unknown error code tea_time"));
            }
            other => panic!("expected IdentityProvider error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_parameters_reported_in_fixed_order() {
        assert!(matches!(
            CallbackData::parse(&callback_url("state=x&code_challenge=y")),
            Err(OidcError::MissingCallbackParameter(CallbackKey::Code))
        ));
        assert!(matches!(
            CallbackData::parse(&callback_url("code=x&code_challenge=y")),
            Err(OidcError::MissingCallbackParameter(CallbackKey::State))
        ));
        assert!(matches!(
            CallbackData::parse(&callback_url("code=x&state=y")),
            Err(OidcError::MissingCallbackParameter(CallbackKey::Challenge))
        ));
        // All absent: code is named first.
        assert!(matches!(
            CallbackData::parse(&callback_url("")),
            Err(OidcError::MissingCallbackParameter(CallbackKey::Code))
        ));
    }

    #[test]
    fn test_every_standard_error_code_has_a_description() {
        for code in [
            "invalid_request",
            "interaction_required",
            "login_required",
            "account_selection_required",
            "consent_required",
            "invalid_request_uri",
            "invalid_request_object",
            "request_not_supported",
            "request_uri_not_supported",
            "registration_not_supported",
        ] {
            let parsed = AuthenticationErrorCode::parse(code).unwrap();
            assert!(!parsed.description().is_empty());
        }
        assert_eq!(AuthenticationErrorCode::parse("nonsense"), None);
    }
}
