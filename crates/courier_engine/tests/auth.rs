mod support;

use std::sync::Arc;

use courier_core::{Intent, StrategyBook};
use courier_engine::{AuthError, Credentials, ElementResolver, SessionAuthenticator};
use support::{fast_settings, init_logging, FakePage, State, HOME_URL, LOGIN_URL};

fn authenticator() -> SessionAuthenticator {
    init_logging();
    let resolver = Arc::new(ElementResolver::new(StrategyBook::note_defaults()));
    SessionAuthenticator::new(resolver, &fast_settings())
}

fn credentials() -> Credentials {
    Credentials::new("writer@example.com", "secret")
}

#[tokio::test]
async fn login_fills_both_fields_and_leaves_login_surface() {
    let page = FakePage::new(State::note_site());
    let mut auth = authenticator();

    let session = auth.authenticate(&page, &credentials()).await.unwrap();

    assert_eq!(session.identity, "writer@example.com");
    assert_eq!(session.landed_url, HOME_URL);
    let state = page.state();
    assert_eq!(state.events.first().map(String::as_str), Some(&*format!("goto:{LOGIN_URL}")));
    assert_eq!(
        state.node("password").and_then(|n| n.value.as_deref()),
        Some("secret")
    );
}

#[tokio::test]
async fn second_call_reuses_session_without_touching_page() {
    let page = FakePage::new(State::note_site());
    let mut auth = authenticator();

    let first = auth.authenticate(&page, &credentials()).await.unwrap();
    let events_after_login = page.state().events.len();
    let second = auth.authenticate(&page, &credentials()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(page.state().events.len(), events_after_login);
    assert!(auth.session().is_some());
}

#[tokio::test]
async fn missing_password_field_is_reported() {
    let page = FakePage::new(State::note_site().without("password"));
    let mut auth = authenticator();

    let err = auth.authenticate(&page, &credentials()).await.unwrap_err();
    assert!(matches!(err, AuthError::FieldNotFound(Intent::PasswordField)), "{err}");
    assert!(auth.session().is_none());
}

#[tokio::test]
async fn login_without_any_navigation_times_out() {
    let mut site = State::note_site();
    site.accept_login = false;
    let page = FakePage::new(site);
    let mut auth = authenticator();

    let err = auth.authenticate(&page, &credentials()).await.unwrap_err();
    assert!(matches!(err, AuthError::Timeout(budget) if budget == fast_settings().navigation_timeout), "{err}");
    assert!(page.state().events.iter().any(|e| e == "login-rejected"));
    assert!(auth.session().is_none());
}

#[tokio::test]
async fn login_page_reloaded_with_error_is_still_on_login_surface() {
    let mut site = State::note_site();
    site.accept_login = false;
    site.login_error_redirect = true;
    let page = FakePage::new(site);
    let mut auth = authenticator();

    let err = auth.authenticate(&page, &credentials()).await.unwrap_err();
    let expected = format!("{LOGIN_URL}?error=invalid");
    assert!(
        matches!(err, AuthError::StillOnLoginSurface(ref url) if *url == expected),
        "{err}"
    );
}
