//! Client configuration.
//!
//! # Design
//! Every setting is optional. A missing authorizer means requests go out
//! unauthorized, an empty trust map means default certificate verification,
//! and a missing 2FA handler means responses are never inspected for step-up
//! authentication. The configuration is read once when the `Client` is built.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::RequestAuthorizer;
use crate::challenge::TwoFactorHandler;
use crate::observe::{NoopObserver, RequestObserver};
use crate::trust::TrustPolicies;

/// Settings read once by `Client::new`.
#[derive(Clone)]
pub struct ClientConfig {
    base_url: Option<String>,
    authorizer: Option<Arc<dyn RequestAuthorizer>>,
    trust_policies: TrustPolicies,
    two_factor: Option<Arc<dyn TwoFactorHandler>>,
    observer: Arc<dyn RequestObserver>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn authorizer(&self) -> Option<&dyn RequestAuthorizer> {
        self.authorizer.as_deref()
    }

    pub fn trust_policies(&self) -> &TrustPolicies {
        &self.trust_policies
    }

    pub fn two_factor_handler(&self) -> Option<&dyn TwoFactorHandler> {
        self.two_factor.as_deref()
    }

    pub fn observer(&self) -> &dyn RequestObserver {
        self.observer.as_ref()
    }

    pub(crate) fn shared_observer(&self) -> Arc<dyn RequestObserver> {
        self.observer.clone()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            authorizer: None,
            trust_policies: TrustPolicies::new(),
            two_factor: None,
            observer: Arc::new(NoopObserver),
            timeout: None,
            user_agent: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("authorizer", &self.authorizer.is_some())
            .field("trust_policies", &self.trust_policies)
            .field("two_factor", &self.two_factor.is_some())
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Chained builder for `ClientConfig`.
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Base URL request paths are resolved against.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    pub fn authorizer(mut self, authorizer: impl RequestAuthorizer + 'static) -> Self {
        self.config.authorizer = Some(Arc::new(authorizer));
        self
    }

    pub fn trust_policies(mut self, policies: TrustPolicies) -> Self {
        self.config.trust_policies = policies;
        self
    }

    pub fn two_factor_handler(mut self, handler: impl TwoFactorHandler + 'static) -> Self {
        self.config.two_factor = Some(Arc::new(handler));
        self
    }

    /// Same as `two_factor_handler`, for handlers the caller keeps a handle on.
    pub fn shared_two_factor_handler(mut self, handler: Arc<dyn TwoFactorHandler>) -> Self {
        self.config.two_factor = Some(handler);
        self
    }

    pub fn observer(mut self, observer: impl RequestObserver + 'static) -> Self {
        self.config.observer = Arc::new(observer);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
