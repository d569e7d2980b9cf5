use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use courier_core::Intent;
use courier_logging::{courier_debug, courier_info, courier_warn};
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

use crate::resolver::click_handle;
use crate::{DriverError, ElementResolver, PageDriver, PublishSettings};

/// Identity and secret for the target account.
#[derive(Clone)]
pub struct Credentials {
    identity: String,
    secret: String,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: String,
    pub landed_url: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login form incomplete: {0} not found")]
    FieldNotFound(Intent),
    #[error("login did not settle within {0:?}")]
    Timeout(Duration),
    #[error("still on the login surface after submitting ({0})")]
    StillOnLoginSurface(String),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Logs one browser session in. Holds on to the session once established so
/// later calls are free.
pub struct SessionAuthenticator {
    resolver: Arc<ElementResolver>,
    login_url: String,
    element_timeout: Duration,
    navigation_timeout: Duration,
    poll_interval: Duration,
    session: Option<Session>,
}

impl SessionAuthenticator {
    pub fn new(resolver: Arc<ElementResolver>, settings: &PublishSettings) -> Self {
        Self {
            resolver,
            login_url: settings.login_url.clone(),
            element_timeout: settings.element_timeout,
            navigation_timeout: settings.navigation_timeout,
            poll_interval: settings.poll_interval,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub async fn authenticate<P: PageDriver>(
        &mut self,
        page: &P,
        credentials: &Credentials,
    ) -> Result<Session, AuthError> {
        if let Some(session) = &self.session {
            courier_debug!("reusing session of {}", session.identity);
            return Ok(session.clone());
        }

        courier_info!("logging in as {}", credentials.identity());
        page.goto(&self.login_url).await?;

        self.fill(page, Intent::EmailField, credentials.identity()).await?;
        self.fill(page, Intent::PasswordField, credentials.secret()).await?;

        let button = self
            .resolver
            .resolve_within(page, Intent::LoginButton, self.element_timeout, self.poll_interval)
            .await
            .map_err(|_| AuthError::FieldNotFound(Intent::LoginButton))?;
        let before_submit = page.current_url().await.ok();
        click_handle(page, &button).await?;

        let landed_url = self.wait_until_off_login(page, before_submit).await?;
        let session = Session {
            identity: credentials.identity().to_string(),
            landed_url,
        };
        courier_info!("logged in, landed on {}", session.landed_url);
        self.session = Some(session.clone());
        Ok(session)
    }

    async fn fill<P: PageDriver>(
        &self,
        page: &P,
        intent: Intent,
        value: &str,
    ) -> Result<(), AuthError> {
        let field = self
            .resolver
            .resolve_within(page, intent, self.element_timeout, self.poll_interval)
            .await
            .ok()
            .and_then(|handle| handle.into_element())
            .ok_or(AuthError::FieldNotFound(intent))?;
        page.click(&field).await?;
        page.clear(&field).await?;
        page.type_text(&field, value, Duration::ZERO).await?;
        Ok(())
    }

    /// Waits for the page to leave the login surface. A navigation that
    /// lands on the login surface again is a rejection; no navigation at all
    /// within the budget is a timeout.
    async fn wait_until_off_login<P: PageDriver>(
        &self,
        page: &P,
        before_submit: Option<String>,
    ) -> Result<String, AuthError> {
        let deadline = Instant::now() + self.navigation_timeout;
        loop {
            match page.current_url().await {
                Ok(url) if !is_login_surface(&url, &self.login_url) => return Ok(url),
                Ok(url) if before_submit.as_deref().is_some_and(|before| before != url) => {
                    courier_warn!("login form reloaded at {url}");
                    return Err(AuthError::StillOnLoginSurface(url));
                }
                Ok(_) => {}
                Err(err) => courier_debug!("url not readable yet: {err}"),
            }
            if Instant::now() >= deadline {
                courier_warn!("no navigation away from login within {:?}", self.navigation_timeout);
                return Err(AuthError::Timeout(self.navigation_timeout));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Whether `current` shows the login page at `login_url`, query ignored.
pub fn is_login_surface(current: &str, login_url: &str) -> bool {
    match (Url::parse(current), Url::parse(login_url)) {
        (Ok(current), Ok(login)) => {
            current.host_str() == login.host_str()
                && current.path().trim_end_matches('/') == login.path().trim_end_matches('/')
        }
        _ => current.contains("/login"),
    }
}
