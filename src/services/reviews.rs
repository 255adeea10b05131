use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{degrade, require_max_len};
use crate::{
    app_error::AppError,
    auth::{Access, CurrentUser, authorize},
    models::{CreateReviewEntity, RatingSummary, ReviewEntity, limits},
    store::Store,
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewReq {
    pub product_id: i32,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
    /// Asserted by the client, not derived from order history.
    pub is_verified_purchase: Option<bool>,
}

/// Reviews of a product, newest first.
pub async fn by_product(store: &dyn Store, product_id: i32) -> Result<Vec<ReviewEntity>, AppError> {
    degrade(store.reviews_by_product(product_id).await, "list reviews")
}

/// Mean rating and review count; both zero when the product has no reviews.
pub async fn average_rating(store: &dyn Store, product_id: i32) -> Result<RatingSummary, AppError> {
    degrade(store.rating_summary(product_id).await, "get average rating")
}

#[instrument(skip_all, fields(caller = caller.id(), product_id = req.product_id))]
pub async fn create(
    store: &dyn Store,
    caller: &CurrentUser,
    req: CreateReviewReq,
) -> Result<ReviewEntity, AppError> {
    authorize(Some(caller), Access::Authenticated)?;
    if !(MIN_RATING..=MAX_RATING).contains(&req.rating) {
        return Err(AppError::BadRequest(format!(
            "rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    if let Some(title) = &req.title {
        require_max_len(title, limits::REVIEW_TITLE, "title")?;
    }

    let review = store
        .create_review(CreateReviewEntity {
            product_id: req.product_id,
            user_id: caller.id(),
            rating: req.rating,
            title: req.title,
            comment: req.comment,
            is_verified_purchase: req.is_verified_purchase.unwrap_or(false),
        })
        .await?;

    info!("Review #{} created", review.id);
    Ok(review)
}

/// Deletes a review. Only its author may do so.
#[instrument(skip(store, caller), fields(caller = caller.id()))]
pub async fn delete(
    store: &dyn Store,
    caller: &CurrentUser,
    review_id: i32,
) -> Result<ReviewEntity, AppError> {
    let review = store
        .review_by_id(review_id)
        .await?
        .ok_or(AppError::NotFound)?;
    authorize(Some(caller), Access::Owner(review.user_id))?;

    let deleted = store.delete_review(review.id).await?;
    info!("Review #{} deleted", deleted.id);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use crate::store::MockStore;

    fn review(product_id: i32, rating: i32) -> CreateReviewReq {
        CreateReviewReq {
            product_id,
            rating,
            title: Some("Great product".into()),
            comment: Some("Fast delivery".into()),
            is_verified_purchase: None,
        }
    }

    #[tokio::test]
    async fn average_is_the_exact_mean_of_all_ratings() {
        let store = MockStore::new();
        let product = fixtures::product(&store, "cars", 100).await;
        let ratings = [5, 4, 4, 2, 1, 3, 5];

        for (n, rating) in ratings.iter().enumerate() {
            let author = fixtures::user(&store, &format!("reviewer-{}", n), "user").await;
            create(&store, &author, review(product.id, *rating))
                .await
                .unwrap();
        }

        let summary = average_rating(&store, product.id).await.unwrap();
        let sum: i32 = ratings.iter().sum();
        assert_eq!(summary.count, ratings.len() as i64);
        assert_eq!(summary.average, sum as f64 / ratings.len() as f64);
    }

    #[tokio::test]
    async fn no_reviews_means_zero_average_and_count() {
        let store = MockStore::new();
        let product = fixtures::product(&store, "cars", 100).await;

        let summary = average_rating(&store, product.id).await.unwrap();
        assert_eq!(summary, RatingSummary { average: 0.0, count: 0 });
    }

    #[tokio::test]
    async fn ratings_outside_one_to_five_are_rejected() {
        let store = MockStore::new();
        let author = fixtures::user(&store, "author", "user").await;
        let product = fixtures::product(&store, "cars", 100).await;

        for rating in [0, 6, -1] {
            let err = create(&store, &author, review(product.id, rating))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
        assert!(by_product(&store, product.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overlong_title_is_rejected() {
        let store = MockStore::new();
        let author = fixtures::user(&store, "author", "user").await;
        let product = fixtures::product(&store, "cars", 100).await;

        let mut req = review(product.id, 4);
        req.title = Some("t".repeat(limits::REVIEW_TITLE + 1));
        let err = create(&store, &author, req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(by_product(&store, product.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn verified_purchase_defaults_to_false() {
        let store = MockStore::new();
        let author = fixtures::user(&store, "author", "user").await;
        let product = fixtures::product(&store, "cars", 100).await;

        let created = create(&store, &author, review(product.id, 5)).await.unwrap();
        assert!(!created.is_verified_purchase);
        assert_eq!(created.user_id, author.id());
    }

    #[tokio::test]
    async fn reviews_are_listed_newest_first() {
        let store = MockStore::new();
        let author = fixtures::user(&store, "author", "user").await;
        let product = fixtures::product(&store, "cars", 100).await;

        let older = create(&store, &author, review(product.id, 3)).await.unwrap();
        let newer = create(&store, &author, review(product.id, 4)).await.unwrap();

        let ids: Vec<i32> = by_product(&store, product.id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn only_the_author_can_delete_a_review() {
        let store = MockStore::new();
        let author = fixtures::user(&store, "author", "user").await;
        let intruder = fixtures::user(&store, "intruder", "user").await;
        let admin = fixtures::user(&store, "admin", "admin").await;
        let product = fixtures::product(&store, "cars", 100).await;
        let created = create(&store, &author, review(product.id, 5)).await.unwrap();

        for caller in [&intruder, &admin] {
            let err = delete(&store, caller, created.id).await.unwrap_err();
            assert!(matches!(err, AppError::ForbiddenResource(_)));
        }
        assert_eq!(by_product(&store, product.id).await.unwrap().len(), 1);

        delete(&store, &author, created.id).await.unwrap();
        assert!(by_product(&store, product.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_missing_review_is_not_found() {
        let store = MockStore::new();
        let author = fixtures::user(&store, "author", "user").await;

        assert!(matches!(
            delete(&store, &author, 77).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn unavailable_store_degrades_the_average_to_zero() {
        let store = MockStore::new();
        store.set_unavailable(true).await;

        assert_eq!(
            average_rating(&store, 1).await.unwrap(),
            RatingSummary::default()
        );
        assert!(by_product(&store, 1).await.unwrap().is_empty());
    }
}
