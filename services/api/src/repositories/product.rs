//! Product repository for catalog queries

use common::error::DatabaseResult;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{Category, NewProduct, Product, ProductSort, UpdateProduct};

/// Catalog listing filters, already parsed and validated by the caller
#[derive(Debug, Clone, Default)]
pub struct CatalogFilters {
    pub category: Option<Category>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub search: Option<String>,
}

/// Product repository
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List active products with filters, sorting and pagination
    ///
    /// Returns the requested page together with the total match count.
    /// `page` and `limit` are expected to be clamped by the caller.
    pub async fn list(
        &self,
        filters: &CatalogFilters,
        sort: ProductSort,
        page: u32,
        limit: u32,
    ) -> DatabaseResult<(Vec<Product>, i64)> {
        let offset = i64::from(page - 1) * i64::from(limit);

        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM products WHERE is_active = TRUE");
        push_filters(&mut query, filters);

        // Secondary key keeps the windowing stable when values tie
        query.push(" ORDER BY ");
        match sort {
            ProductSort::PriceAsc => query.push("price ASC, id ASC"),
            ProductSort::PriceDesc => query.push("price DESC, id ASC"),
            ProductSort::NameAsc => query.push("name ASC, id ASC"),
            ProductSort::NameDesc => query.push("name DESC, id ASC"),
            ProductSort::Newest => query.push("created_at DESC, id DESC"),
        };

        query.push(" LIMIT ");
        query.push_bind(i64::from(limit));
        query.push(" OFFSET ");
        query.push_bind(offset);

        let products = query
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM products WHERE is_active = TRUE");
        push_filters(&mut count_query, filters);

        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((products, total))
    }

    /// Find a product by ID, active or not
    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Fetch several products at once
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> DatabaseResult<Vec<Product>> {
        let products =
            sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        Ok(products)
    }

    /// Insert a new product
    pub async fn create(&self, new_product: &NewProduct) -> DatabaseResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products
                (name, description, category, price, stock, manufacturer, image_url, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&new_product.name)
        .bind(new_product.description.as_deref())
        .bind(new_product.category)
        .bind(new_product.price)
        .bind(new_product.stock)
        .bind(new_product.manufacturer.as_deref())
        .bind(new_product.image_url.as_deref())
        .bind(new_product.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    /// Apply a partial update; returns the refreshed row
    pub async fn update(
        &self,
        id: Uuid,
        changes: &UpdateProduct,
    ) -> DatabaseResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                price = COALESCE($5, price),
                stock = COALESCE($6, stock),
                manufacturer = COALESCE($7, manufacturer),
                image_url = COALESCE($8, image_url),
                is_active = COALESCE($9, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.category)
        .bind(changes.price)
        .bind(changes.stock)
        .bind(changes.manufacturer.as_deref())
        .bind(changes.image_url.as_deref())
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Hard-delete a product; captured order lines keep their copies
    pub async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check whether a product with this name exists, case-insensitively
    pub async fn exists_by_name(&self, name: &str) -> DatabaseResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM products WHERE LOWER(name) = LOWER($1))",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Match active products against keywords over name and description
    pub async fn search_keywords(
        &self,
        keywords: &[String],
        limit: i64,
    ) -> DatabaseResult<Vec<Product>> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM products WHERE is_active = TRUE AND (");
        for (i, keyword) in keywords.iter().enumerate() {
            if i > 0 {
                query.push(" OR ");
            }
            let pattern = format!("%{}%", keyword);
            query.push("name ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR description ILIKE ");
            query.push_bind(pattern);
        }
        query.push(") ORDER BY created_at DESC LIMIT ");
        query.push_bind(limit);

        let products = query
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }
}

fn push_filters(query: &mut QueryBuilder<Postgres>, filters: &CatalogFilters) {
    if let Some(category) = filters.category {
        query.push(" AND category = ");
        query.push_bind(category);
    }

    if let Some(min_price) = filters.min_price {
        query.push(" AND price >= ");
        query.push_bind(min_price);
    }

    if let Some(max_price) = filters.max_price {
        query.push(" AND price <= ");
        query.push_bind(max_price);
    }

    if let Some(ref search) = filters.search {
        let pattern = format!("%{}%", search);
        query.push(" AND (name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR description ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::total_pages;
    use std::collections::HashSet;

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

    async fn seed(pool: &PgPool, name: &str, price: i64, is_active: bool) -> Product {
        ProductRepository::new(pool.clone())
            .create(&NewProduct {
                name: name.to_string(),
                description: None,
                category: Category::Vitamin,
                price,
                stock: 25,
                manufacturer: None,
                image_url: None,
                is_active,
            })
            .await
            .expect("failed to seed product")
    }

    /// Test data is isolated with a per-test marker in the name; the
    /// database is shared with whatever else lives in it.
    fn marker() -> String {
        Uuid::new_v4().simple().to_string()
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_listing_windows_are_disjoint_and_complete() {
        let pool = connect().await;
        let repo = ProductRepository::new(pool.clone());
        let marker = marker();

        for i in 1..=12 {
            seed(&pool, &format!("Vitamin {} {}", i, marker), 1_000 * i, true).await;
        }

        let filters = CatalogFilters {
            category: Some(Category::Vitamin),
            search: Some(marker),
            ..Default::default()
        };

        let (second_page, total) = repo
            .list(&filters, ProductSort::PriceAsc, 2, 5)
            .await
            .unwrap();
        assert_eq!(total, 12);
        assert_eq!(second_page.len(), 5);
        assert_eq!(second_page[0].price, 6_000);
        assert_eq!(total_pages(total, 5), 3);

        let mut seen = HashSet::new();
        for page in 1..=3 {
            let (rows, _) = repo
                .list(&filters, ProductSort::PriceAsc, page, 5)
                .await
                .unwrap();
            for product in rows {
                assert!(seen.insert(product.id), "page windows overlap");
            }
        }
        assert_eq!(seen.len(), 12);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_listing_hides_inactive_products() {
        let pool = connect().await;
        let repo = ProductRepository::new(pool.clone());
        let marker = marker();

        let active = seed(&pool, &format!("Zinc {}", marker), 30_000, true).await;
        seed(&pool, &format!("Zinc retired {}", marker), 30_000, false).await;

        let filters = CatalogFilters {
            search: Some(marker),
            ..Default::default()
        };
        let (rows, total) = repo
            .list(&filters, ProductSort::Newest, 1, 10)
            .await
            .unwrap();

        assert_eq!(total, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, active.id);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_search_keywords_is_case_insensitive_and_capped() {
        let pool = connect().await;
        let repo = ProductRepository::new(pool.clone());
        let marker = marker();

        for i in 1..=4 {
            seed(&pool, &format!("Echinacea {} {}", i, marker), 45_000, true).await;
        }

        let matches = repo
            .search_keywords(&[marker.to_uppercase()], 3)
            .await
            .unwrap();
        assert_eq!(matches.len(), 3);
        assert!(matches.iter().all(|p| p.name.contains(&marker)));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_exists_by_name_ignores_case() {
        let pool = connect().await;
        let repo = ProductRepository::new(pool.clone());

        let name = format!("Madu Hutan {}", marker());
        seed(&pool, &name, 85_000, true).await;

        assert!(repo.exists_by_name(&name.to_uppercase()).await.unwrap());
        assert!(
            !repo
                .exists_by_name(&format!("Absent {}", marker()))
                .await
                .unwrap()
        );
    }
}
