//! Account Service: orchestrates the validator, the credential and session
//! stores, the reset-token service, and outbound mail. All invariants live
//! here; the handlers above only translate to and from HTTP.

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::account::dto::{
    ChangePasswordRequest, LoginRequest, PublicProfile, RegisterRequest, ResetPasswordRequest,
    SendResetRequest, UpdateProfileRequest,
};
use crate::account::extractors::SessionContext;
use crate::account::{password, reset, session, validate};
use crate::avatars;
use crate::error::{field_error, ApiError, FieldErrors};
use crate::state::AppState;
use crate::store::{NewAccount, Session, StoreError, UserAccount};

/// Serialize the owner-visible subset of an account, resolving the avatar
/// reference to an absolute URL.
pub async fn public_profile(
    state: &AppState,
    account: &UserAccount,
) -> Result<PublicProfile, ApiError> {
    let avatar_url = avatars::avatar_url(
        state.avatars.as_ref(),
        &state.config.avatars,
        account.avatar.as_deref(),
    )
    .await?;
    Ok(PublicProfile {
        user_id: account.id,
        email: account.email.clone(),
        username: account.username.clone(),
        avatar_url,
    })
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<PublicProfile, ApiError> {
    let mut errors = FieldErrors::new();

    let email = match validate::validate_email(&req.email) {
        Ok(email) => Some(email),
        Err(msg) => {
            errors.insert("email", vec![msg.to_string()]);
            None
        }
    };
    let username = match validate::validate_username(&req.username) {
        Ok(username) => Some(username),
        Err(msg) => {
            errors.insert("username", vec![msg.to_string()]);
            None
        }
    };
    if let Err(msg) = validate::validate_password(&req.password) {
        errors.insert("password", vec![msg.to_string()]);
    }

    // Uniqueness is reported alongside the format rules, as another
    // email-kind failure.
    if let Some(email) = email.as_deref() {
        if state.users.find_by_email(email).await?.is_some() {
            errors
                .entry("email")
                .or_default()
                .push(validate::EMAIL_TAKEN.to_string());
        }
    }

    let (email, username) = match (email, username) {
        (Some(email), Some(username)) if errors.is_empty() => (email, username),
        _ => return Err(ApiError::Validation(errors)),
    };

    let password_hash = password::hash_password(&req.password)?;
    let account = match state
        .users
        .create(NewAccount {
            email,
            username,
            password_hash,
        })
        .await
    {
        Ok(account) => account,
        // Lost the check-then-write race; the store's unique constraint is
        // the source of truth.
        Err(StoreError::EmailTaken) => {
            return Err(ApiError::Validation(field_error("email", validate::EMAIL_TAKEN)));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %account.id, email = %account.email, "account registered");
    public_profile(state, &account).await
}

pub async fn login(
    state: &AppState,
    req: LoginRequest,
) -> Result<(String, PublicProfile), ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.trim().is_empty() {
        return Err(ApiError::MissingCredentials);
    }

    let account = match state.users.find_by_email(&email).await? {
        // Unknown address, disabled account, and wrong password all read
        // the same to the caller.
        Some(account) if account.is_active => account,
        _ => return Err(ApiError::InvalidCredentials),
    };

    if !password::verify_password(&req.password, &account.password_hash)? {
        warn!(user_id = %account.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let (_session, token) = session::issue(state, account.id).await?;
    info!(user_id = %account.id, "user logged in");
    let profile = public_profile(state, &account).await?;
    Ok((token, profile))
}

pub async fn logout(state: &AppState, session: Option<Session>) -> Result<(), ApiError> {
    let session = session.ok_or(ApiError::NotLoggedIn)?;
    state.sessions.delete(session.id).await?;
    info!(user_id = %session.user_id, "user logged out");
    Ok(())
}

pub async fn update_profile(
    state: &AppState,
    mut account: UserAccount,
    req: UpdateProfileRequest,
) -> Result<PublicProfile, ApiError> {
    let mut errors = FieldErrors::new();

    let mut new_email = None;
    if let Some(candidate) = &req.email {
        match validate::validate_email(candidate) {
            // Unchanged email skips the uniqueness check.
            Ok(email) if email == account.email => {}
            Ok(email) => {
                if state.users.find_by_email(&email).await?.is_some() {
                    errors
                        .entry("email")
                        .or_default()
                        .push(validate::EMAIL_TAKEN.to_string());
                } else {
                    new_email = Some(email);
                }
            }
            Err(msg) => {
                errors.insert("email", vec![msg.to_string()]);
            }
        }
    }

    let mut new_username = None;
    if let Some(candidate) = &req.username {
        match validate::validate_username(candidate) {
            Ok(username) => new_username = Some(username),
            Err(msg) => {
                errors.insert("username", vec![msg.to_string()]);
            }
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if let Some(email) = new_email {
        account.email = email;
    }
    if let Some(username) = new_username {
        account.username = username;
    }
    if let Some(avatar) = req.avatar {
        // Replacing a stored object releases the old blob.
        if let Some(old) = account.avatar.take() {
            if avatars::is_stored_key(&old) && old != avatar {
                if let Err(e) = state.avatars.delete_object(&old).await {
                    warn!(error = %e, key = %old, "failed to delete replaced avatar");
                }
            }
        }
        account.avatar = Some(avatar);
    }

    match state.users.update(&account).await {
        Ok(()) => {}
        Err(StoreError::EmailTaken) => {
            return Err(ApiError::Validation(field_error("email", validate::EMAIL_TAKEN)));
        }
        Err(e) => return Err(e.into()),
    }

    info!(user_id = %account.id, "profile updated");
    public_profile(state, &account).await
}

pub async fn change_password(
    state: &AppState,
    ctx: &SessionContext,
    req: ChangePasswordRequest,
) -> Result<(), ApiError> {
    if !password::verify_password(&req.old_password, &ctx.account.password_hash)? {
        return Err(ApiError::InvalidOldPassword);
    }
    if let Err(msg) = validate::validate_password(&req.new_password) {
        return Err(ApiError::Validation(field_error("password", msg)));
    }

    let mut account = ctx.account.clone();
    account.password_hash = password::hash_password(&req.new_password)?;
    state.users.update(&account).await?;

    // The acting session survives the rotation; every other session of the
    // account is revoked unless policy says otherwise.
    let mut revoked = 0;
    if state.config.security.revoke_sessions_on_password_change {
        revoked = state
            .sessions
            .delete_for_user(account.id, Some(ctx.session.id))
            .await?;
    }
    info!(user_id = %account.id, revoked, "password changed");
    Ok(())
}

pub async fn send_reset(state: &AppState, req: SendResetRequest) -> Result<(), ApiError> {
    let email = req.email.trim().to_lowercase();
    let account = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(ApiError::UnknownEmail)?;

    let uid = reset::encode_uid(account.id);
    let token = reset::issue(
        &state.config.security.reset_secret,
        &account,
        OffsetDateTime::now_utc(),
    )?;
    let link = format!(
        "{}/reset-password/{}/{}",
        state.config.public_base_url.trim_end_matches('/'),
        uid,
        token
    );

    let recipient = state
        .config
        .smtp
        .override_recipient
        .as_deref()
        .unwrap_or(&account.email);
    if recipient != account.email {
        warn!(user_id = %account.id, "redirecting reset mail to the configured override recipient");
    }

    let subject = "Reset your password";
    let body = format!(
        "Hello {},\n\n\
         Follow this link to choose a new password:\n\n\
         {}\n\n\
         The link expires in {} minutes. If you did not request a reset, you\n\
         can ignore this message.\n",
        account.username, link, state.config.security.reset_token_ttl_minutes
    );

    // One bounded retry; a mail failure must not disturb account state, and
    // none has been touched at this point.
    if let Err(first) = state.mailer.send(recipient, subject, &body).await {
        warn!(error = %first, user_id = %account.id, "reset mail dispatch failed, retrying once");
        state
            .mailer
            .send(recipient, subject, &body)
            .await
            .map_err(ApiError::Delivery)?;
    }

    info!(user_id = %account.id, "password reset mail sent");
    Ok(())
}

pub async fn reset_password(state: &AppState, req: ResetPasswordRequest) -> Result<(), ApiError> {
    let user_id = reset::decode_uid(&req.uid).ok_or(ApiError::UnknownUser)?;
    let account = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::UnknownUser)?;

    reset::verify(
        &state.config.security.reset_secret,
        &account,
        &req.token,
        OffsetDateTime::now_utc(),
        state.config.security.reset_token_ttl_minutes,
    )
    .map_err(|_| ApiError::InvalidToken)?;

    if let Err(msg) = validate::validate_password(&req.new_password) {
        return Err(ApiError::Validation(field_error("password", msg)));
    }

    let mut account = account;
    // Rotating the hash consumes this token and every other outstanding one.
    account.password_hash = password::hash_password(&req.new_password)?;
    state.users.update(&account).await?;

    let mut revoked = 0;
    if state.config.security.revoke_sessions_on_password_change {
        revoked = state.sessions.delete_for_user(account.id, None).await?;
    }
    info!(user_id = %account.id, revoked, "password reset completed");
    Ok(())
}

pub async fn delete_account(state: &AppState, ctx: SessionContext) -> Result<(), ApiError> {
    if let Some(avatar) = ctx
        .account
        .avatar
        .as_deref()
        .filter(|a| avatars::is_stored_key(a))
    {
        if let Err(e) = state.avatars.delete_object(avatar).await {
            warn!(error = %e, user_id = %ctx.account.id, "failed to delete avatar object");
        }
    }
    state.sessions.delete_for_user(ctx.account.id, None).await?;
    state.users.delete(ctx.account.id).await?;
    info!(user_id = %ctx.account.id, "account deleted");
    Ok(())
}
