// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GitHub OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::routes::is_allowed_origin;
use crate::services::tasks::SyncUserPayload;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// How long a login may take between redirect and callback.
const STATE_TTL_MS: i64 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/github", get(auth_start))
        .route("/auth/github/callback", get(auth_callback))
        .route("/auth/logout", get(logout))
}

fn callback_url(state: &AppState) -> String {
    format!("{}/auth/github/callback", state.config.api_url)
}

// ─── OAuth State ─────────────────────────────────────────────

/// Sign `frontend_url` and the issue time into an opaque `state` value.
///
/// Format before encoding: `frontend_url|issued_ms_hex|hmac_hex`.
pub fn sign_state(frontend_url: &str, issued_ms: i64, key: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", frontend_url, issued_ms);

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Check signature and age of a `state` value and return its frontend URL.
pub fn verify_state(state: &str, key: &[u8], now_ms: i64) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;

    // The frontend URL may itself contain '|', so split from the right.
    let mut parts = decoded.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let issued_hex = parts.next()?;
    let frontend_url = parts.next()?;

    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(format!("{}|{}", frontend_url, issued_hex).as_bytes());
    if mac.verify_slice(&hex::decode(signature_hex).ok()?).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_ms = i64::from_str_radix(issued_hex, 16).ok()?;
    if !(0..=STATE_TTL_MS).contains(&(now_ms - issued_ms)) {
        tracing::warn!(issued_ms, now_ms, "Expired OAuth state");
        return None;
    }

    Some(frontend_url.to_string())
}

// ─── Handlers ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Frontend to return to; must be an allowed origin.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start OAuth flow - redirect to GitHub authorization.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
) -> Result<Redirect> {
    let frontend_url = match params.redirect_uri {
        Some(uri) if is_allowed_origin(&uri, &state.config.frontend_url) => uri,
        Some(uri) => {
            tracing::warn!(redirect_uri = %uri, "Ignoring disallowed redirect_uri");
            state.config.frontend_url.clone()
        }
        None => state.config.frontend_url.clone(),
    };

    let oauth_state = sign_state(
        &frontend_url,
        Utc::now().timestamp_millis(),
        &state.config.oauth_state_key,
    )?;
    let auth_url = state
        .oauth
        .authorize_url(&callback_url(&state), &oauth_state);

    tracing::info!(
        client_id = %state.oauth.client_id(),
        frontend_url = %frontend_url,
        "Starting OAuth flow, redirecting to GitHub"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for a token, store the user, create session.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let Some(frontend_url) = verify_state(
        &params.state,
        &state.config.oauth_state_key,
        Utc::now().timestamp_millis(),
    ) else {
        let redirect = format!("{}?error=invalid_state", state.config.frontend_url);
        return Ok(Redirect::temporary(&redirect));
    };

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from GitHub");
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok(Redirect::temporary(&redirect));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'code' parameter".to_string()))?;

    tracing::info!("Exchanging authorization code for token");

    let login = state
        .oauth
        .complete_login(&code, &callback_url(&state))
        .await?;
    let user_id = login.user.id;

    // Keeps streak fields of a returning user
    let user = state
        .sync_service
        .upsert_profile(&login.user, Utc::now())
        .await?;
    state.db.set_tokens(user_id, &login.tokens).await?;

    tracing::info!(
        user_id,
        username = %user.username,
        scopes = ?login.tokens.scopes,
        "OAuth successful, user and token stored"
    );

    // First sync runs in the background so login stays fast
    if let Err(e) = state
        .tasks_service
        .queue_user_sync(&state.config.api_url, SyncUserPayload { user_id })
        .await
    {
        tracing::warn!(user_id, error = %e, "Failed to queue initial sync, continuing anyway");
    }

    let jwt = create_jwt(user_id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    Ok(Redirect::temporary(&format!(
        "{}/callback?token={}",
        frontend_url, jwt
    )))
}

/// Drop the session cookie and return to the frontend.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::temporary(&state.config.frontend_url))
}
