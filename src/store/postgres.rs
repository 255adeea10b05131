use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    ExpressionMethods, NullableExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper,
    dsl::{count_star, sql},
    sql_types::{Double, Nullable},
    upsert::excluded,
};
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::warn;

use crate::{
    aliases::{DbConnection, DbPool},
    db,
    models::{
        CartItemEntity, CartLine, CategoryEntity, CreateCartItemEntity, CreateCategoryEntity,
        CreateOrderEntity, CreateOrderItemEntity, CreateProductEntity, CreateReviewEntity,
        OrderEntity, OrderItemEntity, OrderLine, OrderStatus, ProductEntity, RatingSummary,
        ReviewEntity, UpdateCategoryEntity, UpdateProductEntity, UpsertUserEntity, UserEntity,
    },
    schema::{cart_items, categories, order_items, orders, products, reviews, users},
};

use super::{Store, StoreError, StoreResult};

/// PostgreSQL-backed store. Built without a pool it reports every call as unavailable.
pub struct PgStore {
    pool: Option<DbPool>,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = db::create_pool(url, max_connections).await?;
        Ok(Self { pool: Some(pool) })
    }

    pub fn unavailable() -> Self {
        Self { pool: None }
    }

    async fn conn(&self) -> StoreResult<DbConnection<'_>> {
        let pool = self.pool.as_ref().ok_or(StoreError::Unavailable)?;
        pool.get().await.map_err(|err| {
            warn!("Failed to obtain a DB connection from the pool: {}", err);
            StoreError::Unavailable
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        let conn = &mut self.conn().await?;
        diesel::sql_query("SELECT 1").execute(conn).await?;
        Ok(())
    }

    async fn upsert_user(&self, user: UpsertUserEntity) -> StoreResult<UserEntity> {
        let conn = &mut self.conn().await?;

        let user = diesel::insert_into(users::table)
            .values(&user)
            .on_conflict(users::open_id)
            .do_update()
            .set((&user, users::updated_at.eq(diesel::dsl::now)))
            .returning(UserEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(user)
    }

    async fn user_by_open_id(&self, open_id: &str) -> StoreResult<Option<UserEntity>> {
        let conn = &mut self.conn().await?;

        let user = users::table
            .filter(users::open_id.eq(open_id))
            .select(UserEntity::as_select())
            .first(conn)
            .await
            .optional()?;

        Ok(user)
    }

    async fn active_categories(&self) -> StoreResult<Vec<CategoryEntity>> {
        let conn = &mut self.conn().await?;

        let categories = categories::table
            .filter(categories::is_active.eq(true))
            .order_by((categories::display_order.asc(), categories::id.asc()))
            .select(CategoryEntity::as_select())
            .get_results(conn)
            .await?;

        Ok(categories)
    }

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<CategoryEntity>> {
        let conn = &mut self.conn().await?;

        let category = categories::table
            .filter(categories::slug.eq(slug))
            .select(CategoryEntity::as_select())
            .first(conn)
            .await
            .optional()?;

        Ok(category)
    }

    async fn create_category(&self, category: CreateCategoryEntity) -> StoreResult<CategoryEntity> {
        let conn = &mut self.conn().await?;

        let category = diesel::insert_into(categories::table)
            .values(category)
            .returning(CategoryEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(category)
    }

    async fn update_category(
        &self,
        id: i32,
        patch: UpdateCategoryEntity,
    ) -> StoreResult<CategoryEntity> {
        let conn = &mut self.conn().await?;

        let category = diesel::update(categories::table.find(id))
            .set(&patch)
            .returning(CategoryEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(category)
    }

    async fn delete_category(&self, id: i32) -> StoreResult<CategoryEntity> {
        let conn = &mut self.conn().await?;

        let category = diesel::delete(categories::table.find(id))
            .returning(CategoryEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(category)
    }

    async fn active_products(&self) -> StoreResult<Vec<ProductEntity>> {
        let conn = &mut self.conn().await?;

        let products = products::table
            .filter(products::is_active.eq(true))
            .order_by(products::id.asc())
            .select(ProductEntity::as_select())
            .get_results(conn)
            .await?;

        Ok(products)
    }

    async fn products_by_category(&self, category_id: i32) -> StoreResult<Vec<ProductEntity>> {
        let conn = &mut self.conn().await?;

        let products = products::table
            .filter(products::category_id.eq(category_id))
            .order_by(products::id.asc())
            .select(ProductEntity::as_select())
            .get_results(conn)
            .await?;

        Ok(products)
    }

    async fn product_by_id(&self, id: i32) -> StoreResult<Option<ProductEntity>> {
        let conn = &mut self.conn().await?;

        let product = products::table
            .find(id)
            .select(ProductEntity::as_select())
            .first(conn)
            .await
            .optional()?;

        Ok(product)
    }

    async fn create_product(&self, product: CreateProductEntity) -> StoreResult<ProductEntity> {
        let conn = &mut self.conn().await?;

        let product = diesel::insert_into(products::table)
            .values(product)
            .returning(ProductEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(product)
    }

    async fn update_product(
        &self,
        id: i32,
        patch: UpdateProductEntity,
    ) -> StoreResult<ProductEntity> {
        let conn = &mut self.conn().await?;

        let product = diesel::update(products::table.find(id))
            .set(&patch)
            .returning(ProductEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(product)
    }

    async fn delete_product(&self, id: i32) -> StoreResult<ProductEntity> {
        let conn = &mut self.conn().await?;

        let product = diesel::delete(products::table.find(id))
            .returning(ProductEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(product)
    }

    async fn cart_lines(&self, user_id: i32) -> StoreResult<Vec<CartLine>> {
        let conn = &mut self.conn().await?;

        let lines: Vec<CartLine> = cart_items::table
            .left_join(products::table)
            .filter(cart_items::user_id.eq(user_id))
            .order_by(cart_items::id.asc())
            .select((
                cart_items::id,
                cart_items::product_id,
                cart_items::quantity,
                products::name.nullable(),
                products::price.nullable(),
                products::image_url.nullable(),
            ))
            .load(conn)
            .await?;

        Ok(lines)
    }

    async fn add_to_cart(
        &self,
        user_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> StoreResult<CartItemEntity> {
        let conn = &mut self.conn().await?;

        let item = diesel::insert_into(cart_items::table)
            .values(CreateCartItemEntity {
                user_id,
                product_id,
                quantity,
            })
            .on_conflict((cart_items::user_id, cart_items::product_id))
            .do_update()
            .set(cart_items::quantity.eq(cart_items::quantity + excluded(cart_items::quantity)))
            .returning(CartItemEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(item)
    }

    async fn remove_from_cart(
        &self,
        user_id: i32,
        cart_item_id: i32,
    ) -> StoreResult<CartItemEntity> {
        let conn = &mut self.conn().await?;

        let item = diesel::delete(cart_items::table)
            .filter(cart_items::id.eq(cart_item_id))
            .filter(cart_items::user_id.eq(user_id))
            .returning(CartItemEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(item)
    }

    async fn clear_cart(&self, user_id: i32) -> StoreResult<usize> {
        let conn = &mut self.conn().await?;

        let removed = diesel::delete(cart_items::table.filter(cart_items::user_id.eq(user_id)))
            .execute(conn)
            .await?;

        Ok(removed)
    }

    async fn create_order(
        &self,
        order: CreateOrderEntity,
        lines: Vec<OrderLine>,
    ) -> StoreResult<(OrderEntity, Vec<OrderItemEntity>)> {
        let conn = &mut self.conn().await?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(order)
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let items: Vec<CreateOrderItemEntity> = lines
                    .into_iter()
                    .map(|line| line.into_entity(order.id))
                    .collect();

                let items: Vec<OrderItemEntity> = diesel::insert_into(order_items::table)
                    .values(items)
                    .returning(OrderItemEntity::as_returning())
                    .get_results(conn)
                    .await?;

                Ok::<(OrderEntity, Vec<OrderItemEntity>), StoreError>((order, items))
            })
        })
        .await
    }

    async fn orders_by_user(&self, user_id: i32) -> StoreResult<Vec<OrderEntity>> {
        let conn = &mut self.conn().await?;

        let orders = orders::table
            .filter(orders::user_id.eq(user_id))
            .order_by((orders::created_at.asc(), orders::id.asc()))
            .select(OrderEntity::as_select())
            .get_results(conn)
            .await?;

        Ok(orders)
    }

    async fn all_orders(&self) -> StoreResult<Vec<OrderEntity>> {
        let conn = &mut self.conn().await?;

        let orders = orders::table
            .order_by((orders::created_at.asc(), orders::id.asc()))
            .select(OrderEntity::as_select())
            .get_results(conn)
            .await?;

        Ok(orders)
    }

    async fn order_items(&self, order_ids: &[i32]) -> StoreResult<Vec<OrderItemEntity>> {
        let conn = &mut self.conn().await?;

        let items = order_items::table
            .filter(order_items::order_id.eq_any(order_ids))
            .order_by(order_items::id.asc())
            .select(OrderItemEntity::as_select())
            .get_results(conn)
            .await?;

        Ok(items)
    }

    async fn order_by_id(&self, id: i32) -> StoreResult<Option<OrderEntity>> {
        let conn = &mut self.conn().await?;

        let order = orders::table
            .find(id)
            .select(OrderEntity::as_select())
            .first(conn)
            .await
            .optional()?;

        Ok(order)
    }

    async fn transition_order(
        &self,
        id: i32,
        status: OrderStatus,
    ) -> StoreResult<Option<OrderEntity>> {
        let conn = &mut self.conn().await?;

        let sources: Vec<&str> = status
            .allowed_sources()
            .iter()
            .map(|source| source.as_str())
            .collect();

        let order = diesel::update(
            orders::table
                .find(id)
                .filter(orders::status.eq_any(sources)),
        )
        .set((
            orders::status.eq(status.as_str()),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await
        .optional()?;

        Ok(order)
    }

    async fn reviews_by_product(&self, product_id: i32) -> StoreResult<Vec<ReviewEntity>> {
        let conn = &mut self.conn().await?;

        let reviews = reviews::table
            .filter(reviews::product_id.eq(product_id))
            .order_by((reviews::created_at.desc(), reviews::id.desc()))
            .select(ReviewEntity::as_select())
            .get_results(conn)
            .await?;

        Ok(reviews)
    }

    async fn rating_summary(&self, product_id: i32) -> StoreResult<RatingSummary> {
        let conn = &mut self.conn().await?;

        let (average, count): (Option<f64>, i64) = reviews::table
            .filter(reviews::product_id.eq(product_id))
            .select((
                sql::<Nullable<Double>>("AVG(rating)::float8"),
                count_star(),
            ))
            .get_result(conn)
            .await?;

        Ok(RatingSummary {
            average: average.unwrap_or(0.0),
            count,
        })
    }

    async fn review_by_id(&self, id: i32) -> StoreResult<Option<ReviewEntity>> {
        let conn = &mut self.conn().await?;

        let review = reviews::table
            .find(id)
            .select(ReviewEntity::as_select())
            .first(conn)
            .await
            .optional()?;

        Ok(review)
    }

    async fn create_review(&self, review: CreateReviewEntity) -> StoreResult<ReviewEntity> {
        let conn = &mut self.conn().await?;

        let review = diesel::insert_into(reviews::table)
            .values(review)
            .returning(ReviewEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(review)
    }

    async fn delete_review(&self, id: i32) -> StoreResult<ReviewEntity> {
        let conn = &mut self.conn().await?;

        let review = diesel::delete(reviews::table.find(id))
            .returning(ReviewEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(review)
    }
}
