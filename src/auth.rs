//! Shared-credential login.
//!
//! One username and password from `[auth]`, compared for exact equality.
//! There is no lockout and no token: a successful check flips the
//! session's `logged_in` flag and that is all.

use crate::config::AuthConfig;
use crate::session::Session;

pub fn check_credentials(config: &AuthConfig, username: &str, password: &str) -> bool {
    username == config.username && password == config.password
}

/// Log `session` in if the credentials match. A failed attempt leaves the
/// session exactly as it was.
pub fn login(session: &mut Session, config: &AuthConfig, username: &str, password: &str) -> bool {
    if check_credentials(config, username, password) {
        session.logged_in = true;
        tracing::info!(username, "login succeeded");
        true
    } else {
        tracing::warn!(username, "login failed");
        false
    }
}

pub fn logout(session: &mut Session) {
    session.logged_in = false;
}
