//! Account profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herbwell_core::{Email, UserId};

/// Public profile of a registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: UserId,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// The account email, if present and well-formed.
    #[must_use]
    pub fn contact_email(&self) -> Option<Email> {
        Email::parse_lenient(self.email.as_deref())
    }
}
