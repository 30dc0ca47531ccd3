//! Product reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herbwell_core::{Category, ProductId, Rating, ReviewId, UserId};

/// A stored review. At most one per (user, product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Table the product lives in, when known at submission time.
    pub product_category: Option<Category>,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub product_category: Option<Category>,
    pub rating: Rating,
    pub comment: Option<String>,
}

impl NewReview {
    #[must_use]
    pub fn into_review(self, id: ReviewId, created_at: DateTime<Utc>) -> Review {
        Review {
            id,
            user_id: self.user_id,
            product_id: self.product_id,
            product_category: self.product_category,
            rating: self.rating,
            comment: self.comment,
            created_at,
        }
    }
}

/// Display fields of a review's author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAuthor {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

/// A review joined with its author's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub author: Option<ReviewAuthor>,
}
