use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{degrade, require_max_len, require_non_negative, require_text};
use crate::{
    app_error::AppError,
    auth::{Access, CurrentUser, authorize},
    models::{
        CreateOrderEntity, OrderEntity, OrderItemEntity, OrderLine, OrderStatus, limits,
    },
    store::Store,
};

/// Checkout payload: the order header plus the line snapshots taken by the client.
#[derive(Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderReq {
    pub total_amount: i32,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderLine>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    pub order: OrderEntity,
    pub order_items: Vec<OrderItemEntity>,
}

fn validate(req: &CreateOrderReq) -> Result<(), AppError> {
    if req.items.is_empty() {
        return Err(AppError::BadRequest("An order needs at least one item".into()));
    }
    require_non_negative(req.total_amount, "totalAmount")?;
    if let Some(phone_number) = &req.phone_number {
        require_max_len(phone_number, limits::PHONE_NUMBER, "phoneNumber")?;
    }

    let mut expected: i32 = 0;
    for item in &req.items {
        require_text(&item.product_name, "productName")?;
        require_max_len(&item.product_name, limits::PRODUCT_NAME, "productName")?;
        require_non_negative(item.price, "price")?;
        if item.quantity < 1 {
            return Err(AppError::BadRequest("quantity must be at least 1".into()));
        }
        expected = item
            .price
            .checked_mul(item.quantity)
            .and_then(|line_total| expected.checked_add(line_total))
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;
    }

    if expected != req.total_amount {
        return Err(AppError::BadRequest(format!(
            "totalAmount {} does not match the item total {}",
            req.total_amount, expected
        )));
    }
    Ok(())
}

/// Places an order. The order row and its lines are written in one transaction.
#[instrument(skip_all, fields(caller = caller.id(), items = req.items.len()))]
pub async fn create(
    store: &dyn Store,
    caller: &CurrentUser,
    req: CreateOrderReq,
) -> Result<OrderWithItems, AppError> {
    authorize(Some(caller), Access::Authenticated)?;
    validate(&req)?;

    let header = CreateOrderEntity {
        user_id: caller.id(),
        total_amount: req.total_amount,
        phone_number: req.phone_number,
        notes: req.notes,
    };
    let (order, order_items) = store.create_order(header, req.items).await?;

    info!(
        "Order #{} placed with {} items, total {}",
        order.id,
        order_items.len(),
        order.total_amount
    );
    Ok(OrderWithItems { order, order_items })
}

async fn attach_items(
    store: &dyn Store,
    orders: Vec<OrderEntity>,
) -> Result<Vec<OrderWithItems>, AppError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i32> = orders.iter().map(|order| order.id).collect();
    let items = degrade(store.order_items(&order_ids).await, "list order items")?;

    let mut group: HashMap<i32, Vec<OrderItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let order_items = group.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, order_items }
        })
        .collect())
}

/// The caller's orders, oldest first.
pub async fn my_orders(
    store: &dyn Store,
    caller: &CurrentUser,
) -> Result<Vec<OrderWithItems>, AppError> {
    authorize(Some(caller), Access::Authenticated)?;
    let orders = degrade(store.orders_by_user(caller.id()).await, "list my orders")?;
    attach_items(store, orders).await
}

/// Every order in the system, oldest first. Admin only.
pub async fn all(store: &dyn Store, caller: &CurrentUser) -> Result<Vec<OrderWithItems>, AppError> {
    authorize(Some(caller), Access::Admin)?;
    let orders = degrade(store.all_orders().await, "list orders")?;
    attach_items(store, orders).await
}

#[instrument(skip(store, caller), fields(caller = caller.id()))]
pub async fn update_status(
    store: &dyn Store,
    caller: &CurrentUser,
    id: i32,
    status: OrderStatus,
) -> Result<OrderEntity, AppError> {
    authorize(Some(caller), Access::Admin)?;

    let current = store.order_by_id(id).await?.ok_or(AppError::NotFound)?;
    match store.transition_order(id, status).await? {
        Some(order) => {
            info!(
                "Order #{} moved from {} to {}",
                order.id, current.status, order.status
            );
            Ok(order)
        }
        None => Err(AppError::Conflict(format!(
            "Order #{} cannot move from {} to {}",
            id,
            current.status,
            status.as_str()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use crate::store::MockStore;

    fn line(product_id: i32, name: &str, price: i32, quantity: i32) -> OrderLine {
        OrderLine {
            product_id,
            product_name: name.into(),
            price,
            quantity,
        }
    }

    fn order_req(total_amount: i32, items: Vec<OrderLine>) -> CreateOrderReq {
        CreateOrderReq {
            total_amount,
            phone_number: Some("0500000000".into()),
            notes: None,
            items,
        }
    }

    #[tokio::test]
    async fn creates_one_order_with_its_single_item() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;

        let placed = create(&store, &player, order_req(200, vec![line(1, "A", 100, 2)]))
            .await
            .unwrap();

        assert_eq!(placed.order.status, "pending");
        assert_eq!(placed.order.user_id, player.id());
        assert_eq!(placed.order_items.len(), 1);
        assert_eq!(placed.order_items[0].order_id, placed.order.id);
        assert_eq!(placed.order_items[0].quantity, 2);
        assert_eq!(placed.order_items[0].price, 100);

        let mine = my_orders(&store, &player).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].order.id, placed.order.id);
        assert_eq!(mine[0].order_items.len(), 1);
        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.order_item_count().await, 1);
    }

    #[tokio::test]
    async fn failed_item_insert_leaves_no_order_behind() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;
        let kept = create(&store, &player, order_req(10, vec![line(1, "A", 10, 1)]))
            .await
            .unwrap();

        store.set_fail_on_order_items(true).await;
        let err = create(
            &store,
            &player,
            order_req(250, vec![line(1, "A", 100, 2), line(2, "B", 50, 1)]),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Other(_)));
        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.order_item_count().await, 1);
        let mine = my_orders(&store, &player).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].order.id, kept.order.id);

        store.set_fail_on_order_items(false).await;
        let next = create(&store, &player, order_req(10, vec![line(1, "A", 10, 1)]))
            .await
            .unwrap();
        assert_eq!(store.order_count().await, 2);
        assert_eq!(next.order_items.len(), 1);
    }

    #[tokio::test]
    async fn rejects_inconsistent_or_empty_orders() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;

        let cases = vec![
            order_req(0, vec![]),
            order_req(150, vec![line(1, "A", 100, 2)]),
            order_req(0, vec![line(1, "A", 100, 0)]),
            order_req(-100, vec![line(1, "A", -100, 1)]),
            order_req(100, vec![line(1, " ", 100, 1)]),
        ];
        for req in cases {
            let err = create(&store, &player, req).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn overflowing_line_totals_are_rejected() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;

        let huge = || line(1, "A", i32::MAX, i32::MAX);
        let cases = vec![
            order_req(1, vec![huge(), huge(), huge()]),
            order_req(i32::MAX, vec![line(1, "A", i32::MAX, 1), line(2, "B", 1, 1)]),
        ];
        for req in cases {
            let err = create(&store, &player, req).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }

        let at_limit = order_req(i32::MAX, vec![line(1, "A", i32::MAX, 1)]);
        create(&store, &player, at_limit).await.unwrap();
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn text_longer_than_its_column_is_rejected() {
        let store = MockStore::new();
        let player = fixtures::user(&store, "player", "user").await;

        let long_name = "x".repeat(limits::PRODUCT_NAME + 1);
        let err = create(&store, &player, order_req(10, vec![line(1, &long_name, 10, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let mut req = order_req(10, vec![line(1, "A", 10, 1)]);
        req.phone_number = Some("0".repeat(limits::PHONE_NUMBER + 1));
        let err = create(&store, &player, req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let name_at_limit = "ب".repeat(limits::PRODUCT_NAME);
        create(&store, &player, order_req(10, vec![line(1, &name_at_limit, 10, 1)]))
            .await
            .unwrap();
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn my_orders_only_lists_the_callers_orders_oldest_first() {
        let store = MockStore::new();
        let alice = fixtures::user(&store, "alice", "user").await;
        let bob = fixtures::user(&store, "bob", "user").await;

        let first = create(&store, &alice, order_req(10, vec![line(1, "A", 10, 1)]))
            .await
            .unwrap();
        create(&store, &bob, order_req(20, vec![line(2, "B", 20, 1)]))
            .await
            .unwrap();
        let second = create(&store, &alice, order_req(30, vec![line(3, "C", 15, 2)]))
            .await
            .unwrap();

        let ids: Vec<i32> = my_orders(&store, &alice)
            .await
            .unwrap()
            .iter()
            .map(|o| o.order.id)
            .collect();
        assert_eq!(ids, vec![first.order.id, second.order.id]);
    }

    #[tokio::test]
    async fn only_admins_list_every_order() {
        let store = MockStore::new();
        let admin = fixtures::user(&store, "admin", "admin").await;
        let player = fixtures::user(&store, "player", "user").await;
        create(&store, &player, order_req(10, vec![line(1, "A", 10, 1)]))
            .await
            .unwrap();

        assert!(matches!(
            all(&store, &player).await,
            Err(AppError::ForbiddenResource(_))
        ));
        assert_eq!(all(&store, &admin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn status_follows_the_allowed_transitions() {
        let store = MockStore::new();
        let admin = fixtures::user(&store, "admin", "admin").await;
        let player = fixtures::user(&store, "player", "user").await;
        let placed = create(&store, &player, order_req(10, vec![line(1, "A", 10, 1)]))
            .await
            .unwrap();
        let id = placed.order.id;

        assert!(matches!(
            update_status(&store, &player, id, OrderStatus::Processing).await,
            Err(AppError::ForbiddenResource(_))
        ));
        assert!(matches!(
            update_status(&store, &admin, id, OrderStatus::Completed).await,
            Err(AppError::Conflict(_))
        ));

        let processing = update_status(&store, &admin, id, OrderStatus::Processing)
            .await
            .unwrap();
        assert_eq!(processing.status, "processing");
        let completed = update_status(&store, &admin, id, OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.status, "completed");

        assert!(matches!(
            update_status(&store, &admin, id, OrderStatus::Cancelled).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            update_status(&store, &admin, 9999, OrderStatus::Cancelled).await,
            Err(AppError::NotFound)
        ));
    }
}
