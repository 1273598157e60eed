use super::SESSION_NAME;
use mortar_core::Environment;
use std::time::Duration;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

/// Session cookie settings.
///
/// Defaults to a secure, HTTP-only `auth_session` cookie on `/` with
/// `SameSite=Lax` that lives as long as the browser session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cookie name
    pub cookie_name: String,
    /// Cookie path
    pub path: String,
    /// Cookie domain, host-only when `None`
    pub domain: Option<String>,
    /// Only send the cookie over HTTPS
    pub secure: bool,
    /// Hide the cookie from scripts
    pub http_only: bool,
    /// Inactivity timeout; `None` for a browser-session cookie
    pub max_age: Option<Duration>,
    /// SameSite policy
    pub same_site: SameSite,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: SESSION_NAME.to_string(),
            path: "/".to_string(),
            domain: None,
            secure: true,
            http_only: true,
            max_age: None,
            same_site: SameSite::Lax,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings suited to a deployment profile.
    ///
    /// Production gets strict SameSite and a two hour inactivity timeout.
    /// Other profiles allow plain HTTP so the cookie works on localhost.
    pub fn for_environment(environment: &Environment) -> Self {
        if environment.is_production() {
            Self::default()
                .same_site(SameSite::Strict)
                .max_age(Duration::from_secs(2 * 60 * 60))
        } else {
            Self::default()
                .secure(false)
                .max_age(Duration::from_secs(7 * 24 * 60 * 60))
        }
    }

    /// Set the cookie name
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the cookie path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the cookie domain
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the `Secure` flag
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the `HttpOnly` flag
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Expire sessions after this much inactivity
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Set the SameSite policy
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Build the session manager layer over an external store
    pub fn layer<S: SessionStore>(&self, store: S) -> SessionManagerLayer<S> {
        let mut layer = SessionManagerLayer::new(store)
            .with_name(self.cookie_name.clone())
            .with_path(self.path.clone())
            .with_secure(self.secure)
            .with_http_only(self.http_only)
            .with_same_site(self.same_site);

        if let Some(domain) = &self.domain {
            layer = layer.with_domain(domain.clone());
        }

        if let Some(max_age) = self.max_age {
            let inactivity = time::Duration::try_from(max_age).unwrap_or(time::Duration::MAX);
            layer = layer.with_expiry(Expiry::OnInactivity(inactivity));
        }

        layer
    }
}
