//! Order repository for database operations
//!
//! Orders are append-mostly: after insert only the status and gateway
//! metadata change, and only through the webhook path.

use std::collections::HashMap;

use common::error::DatabaseResult;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{
    NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, OrderWithItems, PaymentNotification,
};

/// Order line as stored, with its owning order for grouping
#[derive(Debug, FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    product_id: Option<Uuid>,
    name: String,
    price: i64,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            product_id: row.product_id,
            name: row.name,
            price: row.price,
            quantity: row.quantity,
        }
    }
}

/// Order repository
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new order repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its captured lines in one transaction
    pub async fn create_with_items(
        &self,
        new_order: &NewOrder,
        items: &[NewOrderItem],
    ) -> DatabaseResult<Order> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders
                (order_id, user_id, total_amount, status,
                 customer_name, customer_email, customer_phone, customer_address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&new_order.order_id)
        .bind(new_order.user_id)
        .bind(new_order.total_amount)
        .bind(OrderStatus::Pending)
        .bind(new_order.customer_name.as_deref())
        .bind(new_order.customer_email.as_deref())
        .bind(new_order.customer_phone.as_deref())
        .bind(new_order.customer_address.as_deref())
        .bind(new_order.notes.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        let prices: Vec<i64> = items.iter().map(|i| i.price).collect();
        let quantities: Vec<i32> = items.iter().map(|i| i.quantity).collect();

        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, name, price, quantity)
            SELECT $1, unnest($2::uuid[]), unnest($3::text[]), unnest($4::bigint[]), unnest($5::int[])
            "#,
        )
        .bind(order.id)
        .bind(&product_ids)
        .bind(&names)
        .bind(&prices)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// List a user's orders, newest first, with their lines
    ///
    /// `page` and `limit` are expected to be clamped by the caller.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<OrderStatus>,
        page: u32,
        limit: u32,
    ) -> DatabaseResult<(Vec<OrderWithItems>, i64)> {
        let offset = i64::from(page - 1) * i64::from(limit);

        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM orders WHERE user_id = ");
        query.push_bind(user_id);
        if let Some(status) = status {
            query.push(" AND status = ");
            query.push_bind(status);
        }
        query.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        query.push_bind(i64::from(limit));
        query.push(" OFFSET ");
        query.push_bind(offset);

        let orders = query.build_query_as::<Order>().fetch_all(&self.pool).await?;

        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE user_id = ");
        count_query.push_bind(user_id);
        if let Some(status) = status {
            count_query.push(" AND status = ");
            count_query.push_bind(status);
        }

        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let with_items = self.attach_items(orders).await?;
        Ok((with_items, total))
    }

    /// Find an order by its public reference, scoped to the owning user
    pub async fn find_for_user(
        &self,
        order_id: &str,
        user_id: Uuid,
    ) -> DatabaseResult<Option<OrderWithItems>> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE order_id = $1 AND user_id = $2",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match order {
            Some(order) => {
                let items = self.items_for(order.id).await?;
                Ok(Some(OrderWithItems { order, items }))
            }
            None => Ok(None),
        }
    }

    /// Find an order by its public reference regardless of owner
    ///
    /// Used by the gateway webhook, which carries no user identity.
    pub async fn find_by_reference(&self, order_id: &str) -> DatabaseResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Captured lines for one order
    pub async fn items_for(&self, order_pk: Uuid) -> DatabaseResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT order_id, product_id, name, price, quantity
            FROM order_items
            WHERE order_id = $1
            "#,
        )
        .bind(order_pk)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    /// Record a gateway notification against an order
    ///
    /// The status is overwritten whenever the mapping produced one; a later
    /// notification always wins. Gateway metadata fields keep their last
    /// non-null value. Returns the refreshed row, or `None` when the public
    /// reference is unknown.
    pub async fn apply_notification(
        &self,
        order_id: &str,
        new_status: Option<OrderStatus>,
        notification: &PaymentNotification,
    ) -> DatabaseResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                status = COALESCE($2, status),
                transaction_status = COALESCE($3, transaction_status),
                payment_method = COALESCE($4, payment_method),
                gateway_transaction_id = COALESCE($5, gateway_transaction_id),
                gateway_status_code = COALESCE($6, gateway_status_code),
                gateway_gross_amount = COALESCE($7, gateway_gross_amount),
                gateway_payment_type = COALESCE($8, gateway_payment_type),
                gateway_transaction_time = COALESCE($9, gateway_transaction_time),
                gateway_settlement_time = COALESCE($10, gateway_settlement_time),
                updated_at = NOW()
            WHERE order_id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(new_status)
        .bind(notification.transaction_status.as_deref())
        .bind(notification.payment_type.as_deref())
        .bind(notification.transaction_id.as_deref())
        .bind(notification.status_code.as_deref())
        .bind(notification.gross_amount.as_deref())
        .bind(notification.payment_type.as_deref())
        .bind(notification.transaction_time.as_deref())
        .bind(notification.settlement_time.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn attach_items(&self, orders: Vec<Order>) -> DatabaseResult<Vec<OrderWithItems>> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_pks: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT order_id, product_id, name, price, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            "#,
        )
        .bind(&order_pks)
        .fetch_all(&self.pool)
        .await?;

        let mut items_map: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            items_map
                .entry(row.order_id)
                .or_default()
                .push(OrderItem::from(row));
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = items_map.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, NewProduct, NewUser, Product};
    use crate::repositories::{ProductRepository, UserRepository};
    use crate::services::payment::generate_order_id;

    async fn connect() -> PgPool {
        let config = common::database::DatabaseConfig::from_env().expect("DATABASE_URL not set");
        let pool = common::database::init_pool(&config)
            .await
            .expect("failed to connect to database");
        common::database::run_migrations(&pool, &sqlx::migrate!())
            .await
            .expect("failed to apply migrations");
        pool
    }

    async fn seed_user(pool: &PgPool) -> Uuid {
        let users = UserRepository::new(pool.clone());
        let user = users
            .create(&NewUser {
                name: "Order Tester".to_string(),
                email: format!("order-{}@test.local", Uuid::new_v4().simple()),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .expect("failed to seed user");
        user.id
    }

    async fn seed_product(pool: &PgPool) -> Product {
        let products = ProductRepository::new(pool.clone());
        products
            .create(&NewProduct {
                name: format!("Order Test Product {}", Uuid::new_v4().simple()),
                description: None,
                category: Category::Supplement,
                price: 75_000,
                stock: 100,
                manufacturer: None,
                image_url: None,
                is_active: true,
            })
            .await
            .expect("failed to seed product")
    }

    async fn place_order(repo: &OrderRepository, user_id: Uuid, product: &Product) -> Order {
        repo.create_with_items(
            &NewOrder {
                order_id: generate_order_id(),
                user_id,
                total_amount: product.price * 2,
                customer_name: Some("Budi Santoso".to_string()),
                customer_email: None,
                customer_phone: None,
                customer_address: None,
                notes: None,
            },
            &[NewOrderItem {
                product_id: product.id,
                name: product.name.clone(),
                price: product.price,
                quantity: 2,
            }],
        )
        .await
        .expect("failed to create order")
    }

    fn notification(transaction_status: &str, transaction_id: Option<&str>) -> PaymentNotification {
        PaymentNotification {
            order_id: None,
            transaction_status: Some(transaction_status.to_string()),
            fraud_status: None,
            payment_type: Some("qris".to_string()),
            transaction_id: transaction_id.map(str::to_string),
            status_code: Some("200".to_string()),
            gross_amount: None,
            transaction_time: None,
            settlement_time: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_create_with_items_round_trip() {
        let pool = connect().await;
        let repo = OrderRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let product = seed_product(&pool).await;

        let order = place_order(&repo, user_id, &product).await;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, product.price * 2);

        let found = repo
            .find_by_reference(&order.order_id)
            .await
            .unwrap()
            .expect("order not found by reference");
        assert_eq!(found.id, order.id);

        let items = repo.items_for(order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, product.name);
        assert_eq!(items[0].price, product.price);
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_later_notification_overwrites_status() {
        let pool = connect().await;
        let repo = OrderRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let product = seed_product(&pool).await;
        let order = place_order(&repo, user_id, &product).await;

        let paid = repo
            .apply_notification(
                &order.order_id,
                Some(OrderStatus::Paid),
                &notification("settlement", Some("txn-1")),
            )
            .await
            .unwrap()
            .expect("order vanished");
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.gateway_transaction_id.as_deref(), Some("txn-1"));

        // A later notification still moves the status; metadata keeps its
        // last non-null value
        let expired = repo
            .apply_notification(
                &order.order_id,
                Some(OrderStatus::Failed),
                &notification("expire", None),
            )
            .await
            .unwrap()
            .expect("order vanished");
        assert_eq!(expired.status, OrderStatus::Failed);
        assert_eq!(expired.transaction_status.as_deref(), Some("expire"));
        assert_eq!(expired.gateway_transaction_id.as_deref(), Some("txn-1"));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_notification_for_unknown_reference() {
        let pool = connect().await;
        let repo = OrderRepository::new(pool);

        let result = repo
            .apply_notification(
                "ORDER-0-missing",
                Some(OrderStatus::Paid),
                &notification("settlement", None),
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_list_for_user_windows_pages() {
        let pool = connect().await;
        let repo = OrderRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let product = seed_product(&pool).await;

        for _ in 0..3 {
            place_order(&repo, user_id, &product).await;
        }

        let (first_page, total) = repo.list_for_user(user_id, None, 1, 2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(first_page.len(), 2);

        let (second_page, _) = repo.list_for_user(user_id, None, 2, 2).await.unwrap();
        assert_eq!(second_page.len(), 1);

        let (paid_only, paid_total) = repo
            .list_for_user(user_id, Some(OrderStatus::Paid), 1, 10)
            .await
            .unwrap();
        assert!(paid_only.is_empty());
        assert_eq!(paid_total, 0);

        // Lookups never cross users
        let other_user = seed_user(&pool).await;
        let (other_orders, other_total) =
            repo.list_for_user(other_user, None, 1, 10).await.unwrap();
        assert!(other_orders.is_empty());
        assert_eq!(other_total, 0);

        let first_ref = &first_page[0].order.order_id;
        assert!(
            repo.find_for_user(first_ref, other_user)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            repo.find_for_user(first_ref, user_id)
                .await
                .unwrap()
                .is_some()
        );
    }
}
