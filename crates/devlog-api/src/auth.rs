use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use rand_core::OsRng;
use tracing::{info, warn};

use devlog_db::Database;
use devlog_types::api::{LoginForm, RegisterForm};
use devlog_types::models::Role;

use crate::AppState;
use crate::error::{ApiError, blocking};
use crate::session::{self, Identity};
use crate::views;

const DUPLICATE_USER: &str = "Username already exists";
const BAD_CREDENTIALS: &str = "Invalid username or password";

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// POST /register — create a `user` account and log it in.
///
/// Every store failure is reported as a taken username, whatever the cause.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    if form.username.is_empty() || form.password.is_empty() {
        return Ok(views::alert_redirect(BAD_CREDENTIALS, "/").into_response());
    }

    let password = form.password;
    let password_hash = blocking(move || hash_password(&password)).await?;

    let db = state.db.clone();
    let username = form.username.clone();
    let created = blocking(move || Ok(db.create_user(&username, &password_hash, Role::User))).await?;

    let user_id = match created {
        Ok(id) => id,
        Err(e) => {
            warn!("Registration of '{}' failed: {:#}", form.username, e);
            return Ok(views::alert_redirect(DUPLICATE_USER, "/").into_response());
        }
    };

    info!("Registered user '{}'", form.username);
    let identity = Identity {
        user_id,
        username: form.username,
        role: Role::User,
    };
    start_session(&state, jar, &identity)
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if form.username.is_empty() || form.password.is_empty() {
        return Ok(views::alert_redirect(BAD_CREDENTIALS, "/").into_response());
    }

    let db = state.db.clone();
    let username = form.username.clone();
    let password = form.password;
    let user = blocking(move || {
        let user = db
            .get_user_by_username(&username)?
            .filter(|user| verify_password(&password, &user.password));
        Ok(user)
    })
    .await?;

    let Some(user) = user else {
        info!("Failed login for '{}'", form.username);
        return Ok(views::alert_redirect(BAD_CREDENTIALS, "/").into_response());
    };

    let identity = Identity {
        user_id: user.id,
        username: user.username,
        role: user.role,
    };
    start_session(&state, jar, &identity)
}

/// GET /logout
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.remove(session::expired_cookie()), Redirect::to("/"))
}

fn start_session(state: &AppState, jar: CookieJar, identity: &Identity) -> Result<Response, ApiError> {
    let token = session::issue_token(&state.session_secret, identity)?;
    Ok((jar.add(session::session_cookie(token)), Redirect::to("/")).into_response())
}

/// First-run admin account. Returns `true` when the account was created.
///
/// An existing account with the same name is left untouched, whatever its role.
pub fn bootstrap_admin(db: &Database, username: &str, password: &str) -> anyhow::Result<bool> {
    if let Some(existing) = db.get_user_by_username(username)? {
        if existing.role != Role::Admin {
            warn!("Bootstrap admin '{}' exists without the admin role", username);
        }
        return Ok(false);
    }

    let password_hash = hash_password(password)?;
    db.create_user(username, &password_hash, Role::Admin)?;
    info!("Created admin account '{}'", username);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-phc-string"));
    }

    #[test]
    fn every_hash_gets_a_fresh_salt() {
        let first = hash_password("same-password").unwrap();
        let second = hash_password("same-password").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("same-password", &first));
        assert!(verify_password("same-password", &second));
    }

    #[test]
    fn bootstrap_admin_runs_once() {
        let db = Database::open_in_memory().unwrap();
        assert!(bootstrap_admin(&db, "root", "s3cret").unwrap());
        assert!(!bootstrap_admin(&db, "root", "other").unwrap());

        let user = db.get_user_by_username("root").unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(verify_password("s3cret", &user.password));
    }
}
