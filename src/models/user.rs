//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// GitHub account ID (also used as document ID)
    pub github_id: u64,
    /// GitHub login
    pub username: String,
    /// Avatar URL
    pub avatar_url: Option<String>,
    /// When user first connected
    pub created_at: String,
    /// Length of the live run of active days (0 when broken)
    #[serde(default)]
    pub current_streak: u32,
    /// Longest run ever observed; never decreases
    #[serde(default)]
    pub longest_streak: u32,
    /// When the last sync completed
    #[serde(default)]
    pub last_synced_at: Option<String>,
}

impl User {
    /// Store a freshly computed streak. The longest streak only ratchets up.
    pub fn apply_streak(&mut self, current: u32, longest: u32) {
        self.current_streak = current;
        self.longest_streak = self.longest_streak.max(longest);
    }
}

/// User's GitHub credential.
///
/// The access token is opaque to this service; it is only ever presented
/// back to GitHub as a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTokens {
    pub access_token: String,
    /// Granted OAuth scopes
    #[serde(default)]
    pub scopes: Vec<String>,
}
