// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GitHub OAuth web flow.
//!
//! Builds the authorize redirect and exchanges the callback code for an
//! access token, then resolves the token's owner.

use crate::config::Config;
use crate::error::AppError;
use crate::models::UserTokens;
use crate::services::github::{GitHubClient, GitHubUser, UpstreamError, USER_AGENT};
use serde::{Deserialize, Serialize};

/// Scopes requested at login. `repo` is needed for private-repo events.
const OAUTH_SCOPES: &str = "read:user repo";

/// Outcome of a completed login.
#[derive(Debug, Clone)]
pub struct OAuthResult {
    pub user: GitHubUser,
    pub tokens: UserTokens,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
}

/// GitHub answers 200 with an `error` field for a bad code.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    scope: String,
    error: Option<String>,
    error_description: Option<String>,
}

/// Client for GitHub's OAuth endpoints.
#[derive(Clone)]
pub struct GitHubOAuth {
    http: reqwest::Client,
    oauth_base_url: String,
    client_id: String,
    client_secret: String,
    api: GitHubClient,
}

impl GitHubOAuth {
    pub fn new(config: &Config, api: GitHubClient) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            oauth_base_url: config.github_oauth_url.clone(),
            client_id: config.github_client_id.clone(),
            client_secret: config.github_client_secret.clone(),
            api,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// URL to send the browser to for consent.
    pub fn authorize_url(&self, callback_url: &str, state: &str) -> String {
        format!(
            "{}/login/oauth/authorize?client_id={}&redirect_uri={}&scope={}&state={}",
            self.oauth_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(callback_url),
            urlencoding::encode(OAUTH_SCOPES),
            urlencoding::encode(state)
        )
    }

    /// Exchange the callback `code` and look up who the token belongs to.
    pub async fn complete_login(
        &self,
        code: &str,
        callback_url: &str,
    ) -> Result<OAuthResult, UpstreamError> {
        let response = self
            .http
            .post(format!("{}/login/oauth/access_token", self.oauth_base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                code,
                redirect_uri: callback_url,
            })
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let access_token = match (token.access_token, token.error) {
            (Some(access_token), None) => access_token,
            (_, error) => {
                tracing::warn!(
                    error = ?error,
                    description = ?token.error_description,
                    "GitHub refused the authorization code"
                );
                return Err(UpstreamError::Unauthorized);
            }
        };

        let user = self.api.get_authenticated_user(&access_token).await?;

        Ok(OAuthResult {
            user,
            tokens: UserTokens {
                access_token,
                scopes: parse_scopes(&token.scope),
            },
        })
    }
}

/// GitHub returns granted scopes comma-separated.
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth() -> GitHubOAuth {
        let config = Config::test_default();
        let api = GitHubClient::new(&config.github_api_url).unwrap();
        GitHubOAuth::new(&config, api).unwrap()
    }

    #[test]
    fn test_authorize_url_encodes_parameters() {
        let url = oauth().authorize_url("http://localhost:8080/auth/github/callback", "a+b");

        assert!(url.starts_with("http://127.0.0.1:9/login/oauth/authorize?client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fgithub%2Fcallback"));
        assert!(url.contains("scope=read%3Auser%20repo"));
        assert!(url.ends_with("state=a%2Bb"));
    }

    #[test]
    fn test_parse_scopes() {
        assert_eq!(parse_scopes("repo,read:user"), vec!["repo", "read:user"]);
        assert_eq!(parse_scopes(" repo , "), vec!["repo"]);
        assert!(parse_scopes("").is_empty());
    }
}
