//! `PgStore` against a real PostgreSQL database.
//!
//! Set `TEST_DATABASE_URL` to a disposable database to run these; they are
//! skipped otherwise. Every test truncates all storefront tables first.

use arcade_storefront::{
    db,
    models::{
        CreateCategoryEntity, CreateOrderEntity, CreateProductEntity, CreateReviewEntity,
        OrderLine, RatingSummary, UpsertUserEntity,
    },
    store::{PgStore, Store, StoreError},
};
use chrono::Utc;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use tokio::sync::Mutex;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

// The tests share one database.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

async fn test_store() -> Option<PgStore> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };

    db::run_migrations_blocking(MIGRATIONS, &url)
        .await
        .expect("Failed to run migrations");

    let mut conn = AsyncPgConnection::establish(&url)
        .await
        .expect("Failed to connect to the test database");
    diesel::sql_query(
        "TRUNCATE users, categories, products, cart_items, orders, order_items, reviews \
         RESTART IDENTITY CASCADE",
    )
    .execute(&mut conn)
    .await
    .expect("Failed to clean up");

    Some(
        PgStore::connect(&url, 2)
            .await
            .expect("Failed to build the store"),
    )
}

async fn user(store: &PgStore, open_id: &str) -> i32 {
    store
        .upsert_user(UpsertUserEntity {
            open_id: open_id.into(),
            name: Some(open_id.into()),
            email: None,
            login_method: None,
            role: None,
            last_signed_in: Utc::now(),
        })
        .await
        .expect("Failed to insert user")
        .id
}

/// Creates a category and one product in it; returns `(category_id, product_id)`.
async fn catalog(store: &PgStore, slug: &str) -> (i32, i32) {
    let category = store
        .create_category(CreateCategoryEntity {
            name: slug.into(),
            slug: slug.into(),
            description: None,
            icon: None,
            display_order: Some(1),
        })
        .await
        .expect("Failed to insert category");
    let product = store
        .create_product(CreateProductEntity {
            category_id: category.id,
            name: format!("{} item", slug),
            description: None,
            price: 100,
            image_url: None,
            stock: Some(5),
        })
        .await
        .expect("Failed to insert product");
    (category.id, product.id)
}

fn line(product_id: i32, quantity: i32) -> OrderLine {
    OrderLine {
        product_id,
        product_name: "item".into(),
        price: 100,
        quantity,
    }
}

#[tokio::test]
async fn failing_order_line_rolls_back_the_order() {
    let _guard = DB_LOCK.lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    let user_id = user(&store, "player").await;
    let (_, product_id) = catalog(&store, "cars").await;

    let result = store
        .create_order(
            CreateOrderEntity {
                user_id,
                total_amount: 100,
                phone_number: None,
                notes: None,
            },
            vec![line(product_id, 1), line(product_id, 0)],
        )
        .await;
    assert!(matches!(result, Err(StoreError::Invalid(_))));

    assert!(store.all_orders().await.unwrap().is_empty());
    assert!(store.orders_by_user(user_id).await.unwrap().is_empty());

    let (order, items) = store
        .create_order(
            CreateOrderEntity {
                user_id,
                total_amount: 200,
                phone_number: None,
                notes: None,
            },
            vec![line(product_id, 2)],
        )
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].order_id, order.id);
}

#[tokio::test]
async fn adding_the_same_product_merges_into_one_row() {
    let _guard = DB_LOCK.lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    let user_id = user(&store, "player").await;
    let (_, product_id) = catalog(&store, "cars").await;

    let first = store.add_to_cart(user_id, product_id, 2).await.unwrap();
    let merged = store.add_to_cart(user_id, product_id, 3).await.unwrap();
    assert_eq!(merged.id, first.id);
    assert_eq!(merged.quantity, 5);

    let too_many = store.add_to_cart(user_id, product_id, 995).await;
    assert!(matches!(too_many, Err(StoreError::Invalid(_))));

    let lines = store.cart_lines(user_id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 5);
}

#[tokio::test]
async fn rating_summary_is_the_exact_mean() {
    let _guard = DB_LOCK.lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    let (_, product_id) = catalog(&store, "cars").await;

    assert_eq!(
        store.rating_summary(product_id).await.unwrap(),
        RatingSummary {
            average: 0.0,
            count: 0
        }
    );

    for (n, rating) in [5, 4, 4, 2].into_iter().enumerate() {
        let user_id = user(&store, &format!("reviewer-{}", n)).await;
        store
            .create_review(CreateReviewEntity {
                product_id,
                user_id,
                rating,
                title: None,
                comment: None,
                is_verified_purchase: false,
            })
            .await
            .unwrap();
    }

    assert_eq!(
        store.rating_summary(product_id).await.unwrap(),
        RatingSummary {
            average: 3.75,
            count: 4
        }
    );
}

#[tokio::test]
async fn deleting_a_category_cascades_to_products_carts_and_reviews() {
    let _guard = DB_LOCK.lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    let user_id = user(&store, "player").await;
    let (category_id, product_id) = catalog(&store, "cars").await;
    let (_, kept_product_id) = catalog(&store, "boats").await;

    store.add_to_cart(user_id, product_id, 1).await.unwrap();
    store.add_to_cart(user_id, kept_product_id, 1).await.unwrap();
    store
        .create_review(CreateReviewEntity {
            product_id,
            user_id,
            rating: 5,
            title: None,
            comment: None,
            is_verified_purchase: true,
        })
        .await
        .unwrap();

    store.delete_category(category_id).await.unwrap();

    assert!(store.product_by_id(product_id).await.unwrap().is_none());
    assert!(store.reviews_by_product(product_id).await.unwrap().is_empty());
    let lines = store.cart_lines(user_id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, kept_product_id);
}
