//! Product reviews and rating aggregates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use herbwell_core::{Category, ProductId, Rating, RatingSummary, UserId};

use crate::db::{Database, RepositoryError};
use crate::models::{NewReview, Profile, Review, ReviewAuthor, ReviewWithAuthor};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{0}")]
    Validation(String),

    #[error("you have already reviewed this product")]
    Duplicate,

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ReviewError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => Self::Duplicate,
            other => Self::Repository(other),
        }
    }
}

/// Review submission as received from the client.
///
/// Fields stay loosely typed so that every malformed value is reported as a
/// validation error rather than a decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    #[serde(default)]
    pub product_id: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub product_category: Option<Category>,
}

/// Reviews of one product with their aggregate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReviews {
    pub reviews: Vec<ReviewWithAuthor>,
    #[serde(flatten)]
    pub summary: RatingSummary,
}

pub struct ReviewService<'a> {
    db: &'a dyn Database,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Reviews of a product, newest first, with average and count.
    ///
    /// # Errors
    ///
    /// Returns an error if reviews or profiles cannot be read.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn list_reviews(&self, product_id: ProductId) -> Result<ProductReviews, ReviewError> {
        let reviews = self.db.list_reviews_for_product(product_id).await?;
        let summary = RatingSummary::from_ratings(reviews.iter().map(|r| r.rating));
        let reviews = self.with_authors(reviews).await?;
        Ok(ProductReviews { reviews, summary })
    }

    /// Store a review by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Validation` for a missing product id or a rating
    /// outside 1..=5, and `ReviewError::Duplicate` if the user already
    /// reviewed the product.
    #[instrument(skip(self, submission), fields(user_id = %user_id))]
    pub async fn create_review(
        &self,
        user_id: UserId,
        submission: ReviewSubmission,
    ) -> Result<ReviewWithAuthor, ReviewError> {
        let product_id = parse_product_id(&submission.product_id)?;
        let rating =
            Rating::new(submission.rating).map_err(|e| ReviewError::Validation(e.to_string()))?;

        if self.db.find_review(user_id, product_id).await?.is_some() {
            return Err(ReviewError::Duplicate);
        }

        let review = self
            .db
            .insert_review(NewReview {
                user_id,
                product_id,
                product_category: submission.product_category,
                rating,
                comment: submission
                    .comment
                    .map(|c| c.trim().to_owned())
                    .filter(|c| !c.is_empty()),
            })
            .await?;
        info!(review_id = %review.id, rating = rating.get(), "Review created");

        let author = self.db.get_profile(user_id).await?.map(author_of);
        Ok(ReviewWithAuthor { review, author })
    }

    /// Rating summaries for several products. Every requested id is present,
    /// with `{0, 0}` when it has no reviews.
    ///
    /// # Errors
    ///
    /// Returns an error if ratings cannot be read.
    #[instrument(skip_all, fields(products = product_ids.len()))]
    pub async fn averages_for_many(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, RatingSummary>, ReviewError> {
        let mut grouped: HashMap<ProductId, Vec<Rating>> = product_ids
            .iter()
            .map(|id| (*id, Vec::new()))
            .collect();
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        for (product_id, rating) in self.db.list_ratings_for_products(product_ids).await? {
            grouped.entry(product_id).or_default().push(rating);
        }

        Ok(grouped
            .into_iter()
            .map(|(id, ratings)| (id, RatingSummary::from_ratings(ratings)))
            .collect())
    }

    /// Attach author display fields, loading profiles in one batch.
    pub(crate) async fn with_authors(
        &self,
        reviews: Vec<Review>,
    ) -> Result<Vec<ReviewWithAuthor>, ReviewError> {
        let mut user_ids: Vec<UserId> = reviews.iter().map(|r| r.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let profiles: HashMap<UserId, Profile> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            self.db
                .get_profiles(&user_ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        Ok(reviews
            .into_iter()
            .map(|review| {
                let author = profiles.get(&review.user_id).cloned().map(author_of);
                ReviewWithAuthor { review, author }
            })
            .collect())
    }
}

/// Parse a product id supplied by a client.
///
/// # Errors
///
/// Returns `ReviewError::Validation` when the id is blank or not a UUID.
pub fn parse_product_id(raw: &str) -> Result<ProductId, ReviewError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ReviewError::Validation("productId is required".to_string()));
    }
    raw.parse()
        .map_err(|_| ReviewError::Validation(format!("invalid productId: {raw}")))
}

fn author_of(profile: Profile) -> ReviewAuthor {
    ReviewAuthor {
        full_name: profile.full_name,
        email: profile.email,
    }
}
