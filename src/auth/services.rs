use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};

use crate::{
    auth::{
        claims::SessionUser,
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            RegisterRequest, ResetPasswordRequest,
        },
        error::AuthError,
        password::{hash_password, hash_password_blocking, verify_password_blocking},
        repo::CreateUserError,
        repo_types::{NewUser, User},
        reset::{hash_reset_token, reset_url, ResetToken},
    },
    mail::password_reset_mail,
    state::AppState,
};

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// `local@domain` where the local part is `[a-zA-Z0-9._%+-]+` and the domain is exactly `domain`.
pub(crate) fn is_college_email(email: &str, domain: &str) -> bool {
    lazy_static! {
        static ref LOCAL_PART_RE: Regex = Regex::new(r"^[a-zA-Z0-9._%+-]+$").unwrap();
    }
    match email.split_once('@') {
        Some((local, host)) => host.eq_ignore_ascii_case(domain) && LOCAL_PART_RE.is_match(local),
        None => false,
    }
}

/// Stand-in hash verified for unknown emails so both login failures cost one argon2 run.
fn dummy_password_hash() -> &'static str {
    lazy_static! {
        static ref DUMMY_HASH: String =
            hash_password("lostfound-unknown-account").unwrap_or_default();
    }
    DUMMY_HASH.as_str()
}

fn issue_session(st: &AppState, user: User) -> Result<AuthResponse, AuthError> {
    let token = st.jwt.sign(SessionUser {
        id: user.id,
        email: user.email.clone(),
    })?;
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

pub async fn register(st: &AppState, req: RegisterRequest) -> Result<AuthResponse, AuthError> {
    let name = req.name.trim().to_string();
    let email = normalize_email(&req.email);
    // A missing email is just another address outside the college domain.
    if !is_college_email(&email, &st.config.email_domain) {
        return Err(AuthError::InvalidEmailDomain(st.config.email_domain.clone()));
    }
    if name.is_empty() || req.password.is_empty() {
        return Err(AuthError::MissingFields);
    }

    let password_hash = hash_password_blocking(req.password).await?;

    // The unique index decides; there is no racy existence check up front.
    let user = match st
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        Err(CreateUserError::EmailTaken) => return Err(AuthError::UserAlreadyExists),
        Err(CreateUserError::Other(e)) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue_session(st, user)
}

pub async fn login(st: &AppState, req: LoginRequest) -> Result<AuthResponse, AuthError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AuthError::MissingFields);
    }

    let Some(user) = st.users.find_by_email(&email).await? else {
        let _ = verify_password_blocking(req.password, dummy_password_hash().to_string()).await;
        warn!(email = %email, "login unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password_blocking(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    issue_session(st, user)
}

pub async fn forgot_password(
    st: &AppState,
    req: ForgotPasswordRequest,
) -> Result<MessageResponse, AuthError> {
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(AuthError::MissingFields);
    }

    let user = st
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let ttl_minutes = st.config.reset_ttl_minutes;
    let token = ResetToken::generate(OffsetDateTime::now_utc(), Duration::minutes(ttl_minutes));
    st.users
        .set_reset_token(user.id, &token.hash, token.expires_at)
        .await?;

    let url = reset_url(&st.config.frontend_url, &token.raw);
    let mail = password_reset_mail(&user.email, &user.name, &url, ttl_minutes);
    if let Err(e) = st.mailer.send(mail).await {
        // The user never saw this secret, so it must not stay redeemable.
        if let Err(clear_err) = st.users.clear_reset_token(user.id, &token.hash).await {
            error!(error = ?clear_err, user_id = %user.id, "failed to clear undelivered reset token");
        }
        return Err(AuthError::MailDispatchFailure(e));
    }

    info!(user_id = %user.id, expires_at = %token.expires_at, "password reset link sent");
    Ok(MessageResponse {
        msg: "Password reset link sent to email",
    })
}

pub async fn reset_password(
    st: &AppState,
    raw_token: &str,
    req: ResetPasswordRequest,
) -> Result<MessageResponse, AuthError> {
    if req.password.is_empty() {
        return Err(AuthError::MissingFields);
    }

    let token_hash = hash_reset_token(raw_token.trim());
    let now = OffsetDateTime::now_utc();
    let user = st
        .users
        .find_by_reset_token(&token_hash, now)
        .await?
        .filter(|u| u.has_pending_reset(now))
        .ok_or(AuthError::InvalidOrExpiredToken)?;

    let password_hash = hash_password_blocking(req.password).await?;
    if !st
        .users
        .complete_reset(user.id, &token_hash, &password_hash)
        .await?
    {
        // Another request consumed or replaced the token after our lookup.
        warn!(user_id = %user.id, "reset token raced");
        return Err(AuthError::InvalidOrExpiredToken);
    }

    info!(user_id = %user.id, "password reset completed");
    Ok(MessageResponse {
        msg: "Password reset successful. Please log in.",
    })
}

pub async fn current_user(st: &AppState, session: &SessionUser) -> Result<PublicUser, AuthError> {
    let user = st
        .users
        .find_by_id(session.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    Ok(user.into())
}
