// SPDX-License-Identifier: MIT

//! User identity and the persisted profile section.

use serde::{Deserialize, Serialize};

/// The signed-in user, as supplied by the identity provider.
///
/// An identity change (login, logout, account switch) is a full reset signal
/// for every store in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Opaque stable user identifier; doubles as the document id.
    pub user_id: String,
    pub display_name: String,
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            email: None,
        }
    }
}

/// Profile section of the user document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl UserProfile {
    /// Profile seeded from a fresh identity.
    pub fn from_identity(identity: &UserIdentity, now: &str) -> Self {
        Self {
            display_name: identity.display_name.clone(),
            email: identity.email.clone(),
            created_at: now.to_string(),
        }
    }
}
