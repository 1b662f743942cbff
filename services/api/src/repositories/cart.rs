//! Cart repository for database operations
//!
//! Each cart line is its own row keyed by (user, product), so adds are a
//! single atomic upsert and never rewrite the whole cart.

use common::error::DatabaseResult;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::CartItemView;

/// Cart repository
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    /// Create a new cart repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve the cart against the catalog
    ///
    /// Lines whose product is gone or inactive are filtered from the view;
    /// the stored rows stay untouched.
    pub async fn get_view(&self, user_id: Uuid) -> DatabaseResult<Vec<CartItemView>> {
        let items = sqlx::query_as::<_, CartItemView>(
            r#"
            SELECT p.id AS product_id, p.name, p.price, p.category, p.stock,
                   p.image_url, p.manufacturer, c.quantity, c.added_at
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1 AND p.is_active = TRUE
            ORDER BY c.added_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Add quantity to a cart line, creating the row when absent
    ///
    /// A repeated add sums into the existing row; there is never a second
    /// row for the same product. The original added_at survives.
    pub async fn add(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Stored quantity for one line, if present
    pub async fn find_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> DatabaseResult<Option<i32>> {
        let quantity = sqlx::query_scalar::<_, i32>(
            "SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quantity)
    }

    /// Set an absolute quantity; returns false when the line does not exist
    pub async fn set_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove one line; removing an absent line is not an error
    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Empty the cart
    pub async fn clear(&self, user_id: Uuid) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Number of lines currently stored for the user
    pub async fn count_items(&self, user_id: Uuid) -> DatabaseResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, NewProduct, NewUser};
    use crate::repositories::{ProductRepository, UserRepository};

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
                name: "Cart Tester".to_string(),
                email: format!("cart-{}@test.local", Uuid::new_v4().simple()),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .expect("failed to seed user");
        user.id
    }

    async fn seed_product(pool: &PgPool, stock: i32, is_active: bool) -> Uuid {
        let products = ProductRepository::new(pool.clone());
        let product = products
            .create(&NewProduct {
                name: format!("Cart Test Product {}", Uuid::new_v4().simple()),
                description: None,
                category: Category::Vitamin,
                price: 25_000,
                stock,
                manufacturer: None,
                image_url: None,
                is_active,
            })
            .await
            .expect("failed to seed product");
        product.id
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_repeated_add_sums_into_one_row() {
        let pool = connect().await;
        let repo = CartRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let product_id = seed_product(&pool, 50, true).await;

        repo.add(user_id, product_id, 2).await.unwrap();
        repo.add(user_id, product_id, 3).await.unwrap();

        assert_eq!(
            repo.find_quantity(user_id, product_id).await.unwrap(),
            Some(5)
        );
        assert_eq!(repo.count_items(user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_view_hides_inactive_products() {
        let pool = connect().await;
        let repo = CartRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let active = seed_product(&pool, 10, true).await;
        let inactive = seed_product(&pool, 10, false).await;

        repo.add(user_id, active, 1).await.unwrap();
        repo.add(user_id, inactive, 1).await.unwrap();

        let view = repo.get_view(user_id).await.unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].product_id, active);

        // The stored rows survive; only the view filters
        assert_eq!(repo.count_items(user_id).await.unwrap(), 2);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_set_quantity_reports_missing_rows() {
        let pool = connect().await;
        let repo = CartRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let product_id = seed_product(&pool, 10, true).await;

        assert!(!repo.set_quantity(user_id, product_id, 4).await.unwrap());

        repo.add(user_id, product_id, 1).await.unwrap();
        assert!(repo.set_quantity(user_id, product_id, 4).await.unwrap());
        assert_eq!(
            repo.find_quantity(user_id, product_id).await.unwrap(),
            Some(4)
        );
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_clear_empties_the_cart() {
        let pool = connect().await;
        let repo = CartRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let product_id = seed_product(&pool, 10, true).await;

        repo.add(user_id, product_id, 2).await.unwrap();
        repo.clear(user_id).await.unwrap();

        assert_eq!(repo.count_items(user_id).await.unwrap(), 0);
        assert_eq!(repo.find_quantity(user_id, product_id).await.unwrap(), None);
    }
}
