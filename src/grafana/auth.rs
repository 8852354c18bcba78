//! # Authentication
//!
//! How the operator authenticates against a Grafana instance.

use super::GrafanaClientConfig;

/// Authentication strategy for the Grafana HTTP API
#[derive(Clone, PartialEq, Eq)]
pub enum Authenticator {
    /// Service account or API token sent as a bearer token
    ApiToken(String),
    /// Admin username and password sent as basic auth
    Basic { username: String, password: String },
}

impl Authenticator {
    /// Configure a client to authenticate with this strategy
    ///
    /// Replaces whatever authentication the config carried before.
    pub fn apply_to(&self, config: &mut GrafanaClientConfig) {
        match self {
            Authenticator::ApiToken(token) => {
                config.api_token = Some(token.clone());
                config.basic_auth = None;
            }
            Authenticator::Basic { username, password } => {
                config.basic_auth = Some((username.clone(), password.clone()));
                config.api_token = None;
            }
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Authenticator::ApiToken(_) => f.debug_tuple("ApiToken").field(&"***").finish(),
            Authenticator::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}
