//! Shipping addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herbwell_core::{AddressId, Email, UserId};

/// A stored shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: Option<UserId>,
    pub full_name: String,
    /// Free-text contact email; only used when it parses as an [`Email`].
    pub email: Option<String>,
    pub phone: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// The contact email, if present and well-formed.
    #[must_use]
    pub fn contact_email(&self) -> Option<Email> {
        Email::parse_lenient(self.email.as_deref())
    }
}

/// Address fields supplied at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub user_id: Option<UserId>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

impl NewAddress {
    /// Assign an id and creation time.
    #[must_use]
    pub fn into_address(self, id: AddressId, created_at: DateTime<Utc>) -> Address {
        Address {
            id,
            user_id: self.user_id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            line1: self.line1,
            line2: self.line2,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
            country: self.country,
            is_default: self.is_default,
            created_at,
        }
    }
}
