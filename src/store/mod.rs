//! Persistence seam for the storefront.
//!
//! Services only ever see `dyn Store`; the process entry point decides which
//! implementation backs it. [`PgStore`] talks to PostgreSQL through a pooled
//! diesel-async connection. `MockStore`, behind the `test-support` feature,
//! keeps everything in memory for tests.

use async_trait::async_trait;
use diesel::result::DatabaseErrorKind;
use thiserror::Error;

use crate::aliases::DieselError;
use crate::models::{
    CartItemEntity, CartLine, CategoryEntity, CreateCategoryEntity, CreateOrderEntity,
    CreateProductEntity, CreateReviewEntity, OrderEntity, OrderItemEntity, OrderLine,
    OrderStatus, ProductEntity, RatingSummary, ReviewEntity, UpdateCategoryEntity,
    UpdateProductEntity, UpsertUserEntity, UserEntity,
};

#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod postgres;

#[cfg(any(test, feature = "test-support"))]
pub use mock::MockStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database not available")]
    Unavailable,

    #[error("Record not found")]
    NotFound,

    #[error("Conflicts with an existing record: {0}")]
    Conflict(String),

    #[error("References a record that does not exist: {0}")]
    InvalidReference(String),

    #[error("Violates a constraint: {0}")]
    Invalid(String),

    #[error("Query failed: {0}")]
    Query(DieselError),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => StoreError::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                StoreError::InvalidReference(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
                StoreError::Invalid(info.message().to_string())
            }
            other => StoreError::Query(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Liveness check used by the health route.
    async fn ping(&self) -> StoreResult<()>;

    // Users
    async fn upsert_user(&self, user: UpsertUserEntity) -> StoreResult<UserEntity>;
    async fn user_by_open_id(&self, open_id: &str) -> StoreResult<Option<UserEntity>>;

    // Categories
    async fn active_categories(&self) -> StoreResult<Vec<CategoryEntity>>;
    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<CategoryEntity>>;
    async fn create_category(&self, category: CreateCategoryEntity) -> StoreResult<CategoryEntity>;
    async fn update_category(
        &self,
        id: i32,
        patch: UpdateCategoryEntity,
    ) -> StoreResult<CategoryEntity>;
    /// Hard delete; products of the category go with it.
    async fn delete_category(&self, id: i32) -> StoreResult<CategoryEntity>;

    // Products
    async fn active_products(&self) -> StoreResult<Vec<ProductEntity>>;
    async fn products_by_category(&self, category_id: i32) -> StoreResult<Vec<ProductEntity>>;
    async fn product_by_id(&self, id: i32) -> StoreResult<Option<ProductEntity>>;
    async fn create_product(&self, product: CreateProductEntity) -> StoreResult<ProductEntity>;
    async fn update_product(&self, id: i32, patch: UpdateProductEntity)
    -> StoreResult<ProductEntity>;
    async fn delete_product(&self, id: i32) -> StoreResult<ProductEntity>;

    // Cart
    async fn cart_lines(&self, user_id: i32) -> StoreResult<Vec<CartLine>>;
    /// Inserts the row or adds `quantity` to the existing (user, product) row.
    async fn add_to_cart(
        &self,
        user_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> StoreResult<CartItemEntity>;
    async fn remove_from_cart(&self, user_id: i32, cart_item_id: i32)
    -> StoreResult<CartItemEntity>;
    async fn clear_cart(&self, user_id: i32) -> StoreResult<usize>;

    // Orders
    /// Writes the order and all of its lines in one transaction.
    async fn create_order(
        &self,
        order: CreateOrderEntity,
        lines: Vec<OrderLine>,
    ) -> StoreResult<(OrderEntity, Vec<OrderItemEntity>)>;
    async fn orders_by_user(&self, user_id: i32) -> StoreResult<Vec<OrderEntity>>;
    async fn all_orders(&self) -> StoreResult<Vec<OrderEntity>>;
    async fn order_items(&self, order_ids: &[i32]) -> StoreResult<Vec<OrderItemEntity>>;
    async fn order_by_id(&self, id: i32) -> StoreResult<Option<OrderEntity>>;
    /// Moves the order to `status` only if it currently sits in one of `status.allowed_sources()`.
    /// Returns `None` when the guard rejected the transition.
    async fn transition_order(
        &self,
        id: i32,
        status: OrderStatus,
    ) -> StoreResult<Option<OrderEntity>>;

    // Reviews
    async fn reviews_by_product(&self, product_id: i32) -> StoreResult<Vec<ReviewEntity>>;
    async fn rating_summary(&self, product_id: i32) -> StoreResult<RatingSummary>;
    async fn review_by_id(&self, id: i32) -> StoreResult<Option<ReviewEntity>>;
    async fn create_review(&self, review: CreateReviewEntity) -> StoreResult<ReviewEntity>;
    async fn delete_review(&self, id: i32) -> StoreResult<ReviewEntity>;
}
