//! In-memory store used by the test suite.
//!
//! Mirrors the relational behaviour the service layer depends on: unique slugs
//! and open ids, the (user, product) cart merge, cascading deletes from
//! categories and products, and all-or-nothing order writes. User references
//! are not checked.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult};
use crate::aliases::DieselError;
use crate::models::{
    CartItemEntity, CartLine, CategoryEntity, CreateCategoryEntity, CreateOrderEntity,
    CreateProductEntity, CreateReviewEntity, OrderEntity, OrderItemEntity, OrderLine,
    OrderStatus, ProductEntity, RatingSummary, ReviewEntity, UpdateCategoryEntity,
    UpdateProductEntity, UpsertUserEntity, UserEntity, limits,
};

#[derive(Default)]
struct Tables {
    users: Vec<UserEntity>,
    categories: Vec<CategoryEntity>,
    products: Vec<ProductEntity>,
    cart_items: Vec<CartItemEntity>,
    orders: Vec<OrderEntity>,
    order_items: Vec<OrderItemEntity>,
    reviews: Vec<ReviewEntity>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn category_exists(&self, id: i32) -> bool {
        self.categories.iter().any(|category| category.id == id)
    }

    fn product_exists(&self, id: i32) -> bool {
        self.products.iter().any(|product| product.id == id)
    }

    fn slug_taken(&self, slug: &str, except: Option<i32>) -> bool {
        self.categories
            .iter()
            .any(|category| category.slug == slug && Some(category.id) != except)
    }

    /// Removes the product together with the cart rows and reviews that point at it.
    fn cascade_product(&mut self, product_id: i32) {
        self.products.retain(|product| product.id != product_id);
        self.cart_items.retain(|item| item.product_id != product_id);
        self.reviews.retain(|review| review.product_id != product_id);
    }
}

/// Mock store that keeps every table in memory.
#[derive(Default)]
pub struct MockStore {
    tables: RwLock<Tables>,
    unavailable: RwLock<bool>,
    fail_on_order_items: RwLock<bool>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail as if the database could not be reached.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Makes the last order-line insert of `create_order` fail, after the order row and
    /// the lines before it were written.
    pub async fn set_fail_on_order_items(&self, fail: bool) {
        *self.fail_on_order_items.write().await = fail;
    }

    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    pub async fn order_item_count(&self) -> usize {
        self.tables.read().await.order_items.len()
    }

    async fn ensure_available(&self) -> StoreResult<()> {
        if *self.unavailable.read().await {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MockStore {
    async fn ping(&self) -> StoreResult<()> {
        self.ensure_available().await
    }

    async fn upsert_user(&self, user: UpsertUserEntity) -> StoreResult<UserEntity> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(existing) = tables.users.iter_mut().find(|u| u.open_id == user.open_id) {
            if let Some(name) = user.name {
                existing.name = Some(name);
            }
            if let Some(email) = user.email {
                existing.email = Some(email);
            }
            if let Some(login_method) = user.login_method {
                existing.login_method = Some(login_method);
            }
            if let Some(role) = user.role {
                existing.role = role;
            }
            existing.last_signed_in = user.last_signed_in;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = tables.next_id();
        let created = UserEntity {
            id,
            open_id: user.open_id,
            name: user.name,
            email: user.email,
            login_method: user.login_method,
            role: user.role.unwrap_or_else(|| "user".into()),
            created_at: now,
            updated_at: now,
            last_signed_in: user.last_signed_in,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn user_by_open_id(&self, open_id: &str) -> StoreResult<Option<UserEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.open_id == open_id).cloned())
    }

    async fn active_categories(&self) -> StoreResult<Vec<CategoryEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        let mut categories: Vec<CategoryEntity> = tables
            .categories
            .iter()
            .filter(|category| category.is_active)
            .cloned()
            .collect();
        categories.sort_by_key(|category| (category.display_order, category.id));
        Ok(categories)
    }

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<CategoryEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(&self, category: CreateCategoryEntity) -> StoreResult<CategoryEntity> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        if tables.slug_taken(&category.slug, None) {
            return Err(StoreError::Conflict(format!(
                "category slug '{}' already exists",
                category.slug
            )));
        }

        let id = tables.next_id();
        let created = CategoryEntity {
            id,
            name: category.name,
            slug: category.slug,
            description: category.description,
            icon: category.icon,
            display_order: category.display_order.unwrap_or(0),
            is_active: true,
            created_at: Utc::now(),
        };
        tables.categories.push(created.clone());
        Ok(created)
    }

    async fn update_category(
        &self,
        id: i32,
        patch: UpdateCategoryEntity,
    ) -> StoreResult<CategoryEntity> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        if let Some(slug) = &patch.slug {
            if tables.slug_taken(slug, Some(id)) {
                return Err(StoreError::Conflict(format!(
                    "category slug '{}' already exists",
                    slug
                )));
            }
        }

        let category = tables
            .categories
            .iter_mut()
            .find(|category| category.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(name) = patch.name {
            category.name = name;
        }
        if let Some(slug) = patch.slug {
            category.slug = slug;
        }
        if let Some(description) = patch.description {
            category.description = Some(description);
        }
        if let Some(icon) = patch.icon {
            category.icon = Some(icon);
        }
        if let Some(display_order) = patch.display_order {
            category.display_order = display_order;
        }
        if let Some(is_active) = patch.is_active {
            category.is_active = is_active;
        }
        Ok(category.clone())
    }

    async fn delete_category(&self, id: i32) -> StoreResult<CategoryEntity> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        let position = tables
            .categories
            .iter()
            .position(|category| category.id == id)
            .ok_or(StoreError::NotFound)?;
        let deleted = tables.categories.remove(position);

        let product_ids: Vec<i32> = tables
            .products
            .iter()
            .filter(|product| product.category_id == id)
            .map(|product| product.id)
            .collect();
        for product_id in product_ids {
            tables.cascade_product(product_id);
        }

        Ok(deleted)
    }

    async fn active_products(&self) -> StoreResult<Vec<ProductEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .filter(|product| product.is_active)
            .cloned()
            .collect())
    }

    async fn products_by_category(&self, category_id: i32) -> StoreResult<Vec<ProductEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .filter(|product| product.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn product_by_id(&self, id: i32) -> StoreResult<Option<ProductEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn create_product(&self, product: CreateProductEntity) -> StoreResult<ProductEntity> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        if !tables.category_exists(product.category_id) {
            return Err(StoreError::InvalidReference(format!(
                "category {} does not exist",
                product.category_id
            )));
        }

        let id = tables.next_id();
        let created = ProductEntity {
            id,
            category_id: product.category_id,
            name: product.name,
            description: product.description,
            price: product.price,
            image_url: product.image_url,
            stock: product.stock.unwrap_or(0),
            is_active: true,
            created_at: Utc::now(),
        };
        tables.products.push(created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        id: i32,
        patch: UpdateProductEntity,
    ) -> StoreResult<ProductEntity> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        if let Some(category_id) = patch.category_id {
            if !tables.category_exists(category_id) {
                return Err(StoreError::InvalidReference(format!(
                    "category {} does not exist",
                    category_id
                )));
            }
        }

        let product = tables
            .products
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(category_id) = patch.category_id {
            product.category_id = category_id;
        }
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = Some(description);
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(image_url) = patch.image_url {
            product.image_url = Some(image_url);
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        if let Some(is_active) = patch.is_active {
            product.is_active = is_active;
        }
        Ok(product.clone())
    }

    async fn delete_product(&self, id: i32) -> StoreResult<ProductEntity> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        let deleted = tables
            .products
            .iter()
            .find(|product| product.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        tables.cascade_product(id);
        Ok(deleted)
    }

    async fn cart_lines(&self, user_id: i32) -> StoreResult<Vec<CartLine>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;

        Ok(tables
            .cart_items
            .iter()
            .filter(|item| item.user_id == user_id)
            .map(|item| {
                let product = tables.products.iter().find(|p| p.id == item.product_id);
                CartLine {
                    id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    product_name: product.map(|p| p.name.clone()),
                    product_price: product.map(|p| p.price),
                    product_image: product.and_then(|p| p.image_url.clone()),
                }
            })
            .collect())
    }

    async fn add_to_cart(
        &self,
        user_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> StoreResult<CartItemEntity> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        if !tables.product_exists(product_id) {
            return Err(StoreError::InvalidReference(format!(
                "product {} does not exist",
                product_id
            )));
        }

        if let Some(existing) = tables
            .cart_items
            .iter_mut()
            .find(|item| item.user_id == user_id && item.product_id == product_id)
        {
            // Same bound as the CHECK on cart_items.quantity.
            existing.quantity = existing
                .quantity
                .checked_add(quantity)
                .filter(|merged| *merged <= limits::CART_QUANTITY)
                .ok_or_else(|| {
                    StoreError::Invalid(format!(
                        "cart quantity would exceed {}",
                        limits::CART_QUANTITY
                    ))
                })?;
            return Ok(existing.clone());
        }

        if !(1..=limits::CART_QUANTITY).contains(&quantity) {
            return Err(StoreError::Invalid(format!(
                "cart quantity {} is out of range",
                quantity
            )));
        }

        let id = tables.next_id();
        let created = CartItemEntity {
            id,
            user_id,
            product_id,
            quantity,
            created_at: Utc::now(),
        };
        tables.cart_items.push(created.clone());
        Ok(created)
    }

    async fn remove_from_cart(
        &self,
        user_id: i32,
        cart_item_id: i32,
    ) -> StoreResult<CartItemEntity> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        let position = tables
            .cart_items
            .iter()
            .position(|item| item.id == cart_item_id && item.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        Ok(tables.cart_items.remove(position))
    }

    async fn clear_cart(&self, user_id: i32) -> StoreResult<usize> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        let before = tables.cart_items.len();
        tables.cart_items.retain(|item| item.user_id != user_id);
        Ok(before - tables.cart_items.len())
    }

    async fn create_order(
        &self,
        order: CreateOrderEntity,
        lines: Vec<OrderLine>,
    ) -> StoreResult<(OrderEntity, Vec<OrderItemEntity>)> {
        self.ensure_available().await?;
        let fail_on_items = *self.fail_on_order_items.read().await;
        let mut tables = self.tables.write().await;

        let last_id = tables.last_id;
        let now = Utc::now();
        let created = OrderEntity {
            id: tables.next_id(),
            user_id: order.user_id,
            total_amount: order.total_amount,
            phone_number: order.phone_number,
            notes: order.notes,
            status: OrderStatus::Pending.as_str().into(),
            created_at: now,
            updated_at: now,
        };
        tables.orders.push(created.clone());

        let line_count = lines.len();
        let mut items = Vec::with_capacity(line_count);
        for (n, line) in lines.into_iter().enumerate() {
            let item = line.into_entity(created.id);
            let violates_check = item.quantity < 1 || item.price < 0;
            if violates_check || (fail_on_items && n + 1 == line_count) {
                // Roll back the order row and every line written before this one.
                tables.order_items.retain(|written| written.order_id != created.id);
                tables.orders.retain(|written| written.id != created.id);
                tables.last_id = last_id;
                return Err(if violates_check {
                    StoreError::Invalid(format!("order line {} violates a CHECK", n))
                } else {
                    StoreError::Query(DieselError::RollbackTransaction)
                });
            }

            let written = OrderItemEntity {
                id: tables.next_id(),
                order_id: item.order_id,
                product_id: item.product_id,
                product_name: item.product_name,
                price: item.price,
                quantity: item.quantity,
            };
            tables.order_items.push(written.clone());
            items.push(written);
        }

        Ok((created, items))
    }

    async fn orders_by_user(&self, user_id: i32) -> StoreResult<Vec<OrderEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        let mut orders: Vec<OrderEntity> = tables
            .orders
            .iter()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|order| (order.created_at, order.id));
        Ok(orders)
    }

    async fn all_orders(&self) -> StoreResult<Vec<OrderEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        let mut orders = tables.orders.clone();
        orders.sort_by_key(|order| (order.created_at, order.id));
        Ok(orders)
    }

    async fn order_items(&self, order_ids: &[i32]) -> StoreResult<Vec<OrderItemEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        Ok(tables
            .order_items
            .iter()
            .filter(|item| order_ids.contains(&item.order_id))
            .cloned()
            .collect())
    }

    async fn order_by_id(&self, id: i32) -> StoreResult<Option<OrderEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|order| order.id == id).cloned())
    }

    async fn transition_order(
        &self,
        id: i32,
        status: OrderStatus,
    ) -> StoreResult<Option<OrderEntity>> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        let Some(order) = tables.orders.iter_mut().find(|order| order.id == id) else {
            return Ok(None);
        };
        let accepted = status
            .allowed_sources()
            .iter()
            .any(|source| source.as_str() == order.status);
        if !accepted {
            return Ok(None);
        }

        order.status = status.as_str().into();
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn reviews_by_product(&self, product_id: i32) -> StoreResult<Vec<ReviewEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        let mut reviews: Vec<ReviewEntity> = tables
            .reviews
            .iter()
            .filter(|review| review.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(reviews)
    }

    async fn rating_summary(&self, product_id: i32) -> StoreResult<RatingSummary> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        let ratings: Vec<i32> = tables
            .reviews
            .iter()
            .filter(|review| review.product_id == product_id)
            .map(|review| review.rating)
            .collect();

        if ratings.is_empty() {
            return Ok(RatingSummary::default());
        }
        let sum: i64 = ratings.iter().map(|&rating| i64::from(rating)).sum();
        Ok(RatingSummary {
            average: sum as f64 / ratings.len() as f64,
            count: ratings.len() as i64,
        })
    }

    async fn review_by_id(&self, id: i32) -> StoreResult<Option<ReviewEntity>> {
        self.ensure_available().await?;
        let tables = self.tables.read().await;
        Ok(tables.reviews.iter().find(|review| review.id == id).cloned())
    }

    async fn create_review(&self, review: CreateReviewEntity) -> StoreResult<ReviewEntity> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        if !tables.product_exists(review.product_id) {
            return Err(StoreError::InvalidReference(format!(
                "product {} does not exist",
                review.product_id
            )));
        }

        let id = tables.next_id();
        let created = ReviewEntity {
            id,
            product_id: review.product_id,
            user_id: review.user_id,
            rating: review.rating,
            title: review.title,
            comment: review.comment,
            is_verified_purchase: review.is_verified_purchase,
            created_at: Utc::now(),
        };
        tables.reviews.push(created.clone());
        Ok(created)
    }

    async fn delete_review(&self, id: i32) -> StoreResult<ReviewEntity> {
        self.ensure_available().await?;
        let mut tables = self.tables.write().await;

        let position = tables
            .reviews
            .iter()
            .position(|review| review.id == id)
            .ok_or(StoreError::NotFound)?;
        Ok(tables.reviews.remove(position))
    }
}
