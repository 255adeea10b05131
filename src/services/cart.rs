use tracing::{info, instrument};

use super::degrade;
use crate::{
    app_error::AppError,
    auth::{Access, CurrentUser, authorize},
    models::{CartItemEntity, CartLine, limits},
    store::Store,
};

pub const DEFAULT_QUANTITY: i32 = 1;

pub async fn get(store: &dyn Store, caller: &CurrentUser) -> Result<Vec<CartLine>, AppError> {
    authorize(Some(caller), Access::Authenticated)?;
    degrade(store.cart_lines(caller.id()).await, "get cart")
}

/// Adds `quantity` (default 1) of a product, merging into an existing row for the same product.
/// A row never holds more than [`limits::CART_QUANTITY`].
#[instrument(skip(store, caller), fields(caller = caller.id()))]
pub async fn add(
    store: &dyn Store,
    caller: &CurrentUser,
    product_id: i32,
    quantity: Option<i32>,
) -> Result<CartItemEntity, AppError> {
    authorize(Some(caller), Access::Authenticated)?;

    let quantity = quantity.unwrap_or(DEFAULT_QUANTITY);
    if !(1..=limits::CART_QUANTITY).contains(&quantity) {
        return Err(AppError::BadRequest(format!(
            "quantity must be between 1 and {}",
            limits::CART_QUANTITY
        )));
    }

    let item = store.add_to_cart(caller.id(), product_id, quantity).await?;
    info!(
        "Cart item #{} now holds {} of product #{}",
        item.id, item.quantity, item.product_id
    );
    Ok(item)
}

#[instrument(skip(store, caller), fields(caller = caller.id()))]
pub async fn remove(
    store: &dyn Store,
    caller: &CurrentUser,
    cart_item_id: i32,
) -> Result<CartItemEntity, AppError> {
    authorize(Some(caller), Access::Authenticated)?;
    Ok(store.remove_from_cart(caller.id(), cart_item_id).await?)
}

#[instrument(skip_all, fields(caller = caller.id()))]
pub async fn clear(store: &dyn Store, caller: &CurrentUser) -> Result<usize, AppError> {
    authorize(Some(caller), Access::Authenticated)?;

    let removed = store.clear_cart(caller.id()).await?;
    info!("Cleared {} cart items", removed);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use crate::store::MockStore;

    #[tokio::test]
    async fn adding_the_same_product_twice_merges_quantities() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;
        let product = fixtures::product(&store, "cars", 50000).await;

        let first = add(&store, &player, product.id, Some(2)).await.unwrap();
        let second = add(&store, &player, product.id, Some(3)).await.unwrap();

        assert_eq!(first.id, second.id);
        let lines = get(&store, &player).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[0].product_price, Some(50000));
        assert_eq!(lines[0].product_name.as_deref(), Some("cars item"));
    }

    #[tokio::test]
    async fn quantity_defaults_to_one() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;
        let product = fixtures::product(&store, "cars", 10).await;

        let item = add(&store, &player, product.id, None).await.unwrap();
        assert_eq!(item.quantity, 1);
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;
        let product = fixtures::product(&store, "cars", 10).await;

        for quantity in [0, -3, limits::CART_QUANTITY + 1, i32::MAX] {
            let err = add(&store, &player, product.id, Some(quantity))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
        assert!(get(&store, &player).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn merged_quantity_cannot_pass_the_row_limit() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;
        let product = fixtures::product(&store, "cars", 10).await;

        add(&store, &player, product.id, Some(limits::CART_QUANTITY))
            .await
            .unwrap();
        let err = add(&store, &player, product.id, Some(1)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let lines = get(&store, &player).await.unwrap();
        assert_eq!(lines[0].quantity, limits::CART_QUANTITY);
    }

    #[tokio::test]
    async fn carts_are_scoped_to_their_owner() {
        let store = MockStore::new();
        let alice = fixtures::user(&store, "alice", "user").await;
        let bob = fixtures::user(&store, "bob", "user").await;
        let product = fixtures::product(&store, "cars", 10).await;

        let item = add(&store, &alice, product.id, Some(1)).await.unwrap();

        assert!(get(&store, &bob).await.unwrap().is_empty());
        assert!(matches!(
            remove(&store, &bob, item.id).await,
            Err(AppError::NotFound)
        ));
        assert_eq!(clear(&store, &bob).await.unwrap(), 0);
        assert_eq!(get(&store, &alice).await.unwrap().len(), 1);

        remove(&store, &alice, item.id).await.unwrap();
        assert!(get(&store, &alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_removes_every_row_of_the_caller() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;
        let a = fixtures::product(&store, "cars", 10).await;
        let b = fixtures::product(&store, "packages", 20).await;

        add(&store, &player, a.id, None).await.unwrap();
        add(&store, &player, b.id, None).await.unwrap();

        assert_eq!(clear(&store, &player).await.unwrap(), 2);
        assert!(get(&store, &player).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_product_is_a_bad_request() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;

        let err = add(&store, &player, 4242, None).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn writes_fail_when_the_store_is_down() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;
        store.set_unavailable(true).await;

        assert!(get(&store, &player).await.unwrap().is_empty());
        assert!(matches!(
            add(&store, &player, 1, None).await,
            Err(AppError::StoreUnavailable)
        ));
        assert!(matches!(
            clear(&store, &player).await,
            Err(AppError::StoreUnavailable)
        ));
    }
}
