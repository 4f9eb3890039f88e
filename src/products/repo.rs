use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    ctx::OpCtx,
    error::StoreError,
    products::repo_types::{NewProduct, Product, ProductFields, ProductRow},
};

/// Product persistence. Soft-deleted rows behave exactly like missing ones.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_active_by_id(&self, ctx: &OpCtx, id: i64) -> Result<Product, StoreError>;
    /// Active products of one brand, ordered by id. Empty is not an error.
    async fn list_active_by_brand(
        &self,
        ctx: &OpCtx,
        brand_id: i64,
    ) -> Result<Vec<Product>, StoreError>;
    async fn insert(&self, ctx: &OpCtx, product: NewProduct) -> Result<i64, StoreError>;
    /// `NotFound` when no active row has this id.
    async fn update_fields(
        &self,
        ctx: &OpCtx,
        id: i64,
        fields: &ProductFields,
    ) -> Result<(), StoreError>;
    /// `NotFound` when no active row has this id.
    async fn soft_delete(&self, ctx: &OpCtx, id: i64) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn find_active_by_id(&self, ctx: &OpCtx, id: i64) -> Result<Product, StoreError> {
        ctx.run(async {
            let row = sqlx::query_as::<_, ProductRow>(
                r#"
                SELECT product_id, name, path, price, stock, brand_id
                FROM products
                WHERE product_id = $1 AND flag_active
                "#,
            )
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
            row.map(Product::from).ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn list_active_by_brand(
        &self,
        ctx: &OpCtx,
        brand_id: i64,
    ) -> Result<Vec<Product>, StoreError> {
        ctx.run(async {
            let rows = sqlx::query_as::<_, ProductRow>(
                r#"
                SELECT product_id, name, path, price, stock, brand_id
                FROM products
                WHERE brand_id = $1 AND flag_active
                ORDER BY product_id
                "#,
            )
            .bind(brand_id)
            .fetch_all(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
            Ok(rows.into_iter().map(Product::from).collect())
        })
        .await
    }

    async fn insert(&self, ctx: &OpCtx, product: NewProduct) -> Result<i64, StoreError> {
        ctx.run(async {
            let (id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO products (name, path, price, stock, brand_id, flag_active)
                VALUES ($1, $2, $3, $4, $5, TRUE)
                RETURNING product_id
                "#,
            )
            .bind(&product.fields.name)
            .bind(&product.fields.image_path)
            .bind(product.fields.price)
            .bind(product.fields.stock)
            .bind(product.brand_id)
            .fetch_one(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
            Ok(id)
        })
        .await
    }

    async fn update_fields(
        &self,
        ctx: &OpCtx,
        id: i64,
        fields: &ProductFields,
    ) -> Result<(), StoreError> {
        ctx.run(async {
            let done = sqlx::query(
                r#"
                UPDATE products
                SET name = $1, path = $2, price = $3, stock = $4
                WHERE product_id = $5 AND flag_active
                "#,
            )
            .bind(&fields.name)
            .bind(&fields.image_path)
            .bind(fields.price)
            .bind(fields.stock)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
            if done.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn soft_delete(&self, ctx: &OpCtx, id: i64) -> Result<(), StoreError> {
        ctx.run(async {
            let done = sqlx::query(
                r#"
                UPDATE products
                SET flag_active = FALSE
                WHERE product_id = $1 AND flag_active
                "#,
            )
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
            if done.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
pub mod memory {
    use std::{
        collections::BTreeMap,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use super::*;

    struct Row {
        product: Product,
        active: bool,
    }

    /// In-memory product table that keeps soft-deleted rows around.
    #[derive(Default)]
    pub struct MemoryProductStore {
        rows: Mutex<BTreeMap<i64, Row>>,
    }

    impl MemoryProductStore {
        /// Whether a row exists at all, active or not.
        pub fn row_exists(&self, id: i64) -> bool {
            self.rows.lock().unwrap().contains_key(&id)
        }

        pub fn row_count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ProductStore for MemoryProductStore {
        async fn find_active_by_id(&self, ctx: &OpCtx, id: i64) -> Result<Product, StoreError> {
            ctx.run(async {
                let rows = self.rows.lock().unwrap();
                rows.get(&id)
                    .filter(|r| r.active)
                    .map(|r| r.product.clone())
                    .ok_or(StoreError::NotFound)
            })
            .await
        }

        async fn list_active_by_brand(
            &self,
            ctx: &OpCtx,
            brand_id: i64,
        ) -> Result<Vec<Product>, StoreError> {
            ctx.run(async {
                let rows = self.rows.lock().unwrap();
                Ok(rows
                    .values()
                    .filter(|r| r.active && r.product.brand_id == brand_id)
                    .map(|r| r.product.clone())
                    .collect())
            })
            .await
        }

        async fn insert(&self, ctx: &OpCtx, product: NewProduct) -> Result<i64, StoreError> {
            ctx.run(async move {
                let mut rows = self.rows.lock().unwrap();
                let id = rows.keys().next_back().copied().unwrap_or(0) + 1;
                rows.insert(
                    id,
                    Row {
                        product: Product {
                            id,
                            name: product.fields.name,
                            image_path: product.fields.image_path,
                            price: product.fields.price,
                            stock: product.fields.stock,
                            brand_id: product.brand_id,
                        },
                        active: true,
                    },
                );
                Ok(id)
            })
            .await
        }

        async fn update_fields(
            &self,
            ctx: &OpCtx,
            id: i64,
            fields: &ProductFields,
        ) -> Result<(), StoreError> {
            ctx.run(async {
                let mut rows = self.rows.lock().unwrap();
                let row = rows
                    .get_mut(&id)
                    .filter(|r| r.active)
                    .ok_or(StoreError::NotFound)?;
                row.product.name = fields.name.clone();
                row.product.image_path = fields.image_path.clone();
                row.product.price = fields.price;
                row.product.stock = fields.stock;
                Ok(())
            })
            .await
        }

        async fn soft_delete(&self, ctx: &OpCtx, id: i64) -> Result<(), StoreError> {
            ctx.run(async {
                let mut rows = self.rows.lock().unwrap();
                let row = rows
                    .get_mut(&id)
                    .filter(|r| r.active)
                    .ok_or(StoreError::NotFound)?;
                row.active = false;
                Ok(())
            })
            .await
        }
    }

    /// Counts every call and refuses to do anything. Used to prove a request
    /// was rejected before reaching the store.
    #[derive(Default)]
    pub struct CountingProductStore {
        calls: AtomicUsize,
    }

    impl CountingProductStore {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn touch(&self) -> StoreError {
            self.calls.fetch_add(1, Ordering::SeqCst);
            StoreError::Database(sqlx::Error::PoolClosed)
        }
    }

    #[async_trait]
    impl ProductStore for CountingProductStore {
        async fn find_active_by_id(&self, _ctx: &OpCtx, _id: i64) -> Result<Product, StoreError> {
            Err(self.touch())
        }

        async fn list_active_by_brand(
            &self,
            _ctx: &OpCtx,
            _brand_id: i64,
        ) -> Result<Vec<Product>, StoreError> {
            Err(self.touch())
        }

        async fn insert(&self, _ctx: &OpCtx, _product: NewProduct) -> Result<i64, StoreError> {
            Err(self.touch())
        }

        async fn update_fields(
            &self,
            _ctx: &OpCtx,
            _id: i64,
            _fields: &ProductFields,
        ) -> Result<(), StoreError> {
            Err(self.touch())
        }

        async fn soft_delete(&self, _ctx: &OpCtx, _id: i64) -> Result<(), StoreError> {
            Err(self.touch())
        }
    }

    /// Commits writes to an inner [`MemoryProductStore`], then stalls before
    /// answering, like a database whose acknowledgement is lost.
    pub struct StallingProductStore {
        pub inner: MemoryProductStore,
        pub stall: std::time::Duration,
    }

    #[async_trait]
    impl ProductStore for StallingProductStore {
        async fn find_active_by_id(&self, ctx: &OpCtx, id: i64) -> Result<Product, StoreError> {
            self.inner.find_active_by_id(ctx, id).await
        }

        async fn list_active_by_brand(
            &self,
            ctx: &OpCtx,
            brand_id: i64,
        ) -> Result<Vec<Product>, StoreError> {
            self.inner.list_active_by_brand(ctx, brand_id).await
        }

        async fn insert(&self, ctx: &OpCtx, product: NewProduct) -> Result<i64, StoreError> {
            ctx.run(async move {
                let id = self.inner.insert(&OpCtx::default(), product).await?;
                tokio::time::sleep(self.stall).await;
                Ok(id)
            })
            .await
        }

        async fn update_fields(
            &self,
            ctx: &OpCtx,
            id: i64,
            fields: &ProductFields,
        ) -> Result<(), StoreError> {
            ctx.run(async {
                self.inner.update_fields(&OpCtx::default(), id, fields).await?;
                tokio::time::sleep(self.stall).await;
                Ok(())
            })
            .await
        }

        async fn soft_delete(&self, ctx: &OpCtx, id: i64) -> Result<(), StoreError> {
            self.inner.soft_delete(ctx, id).await
        }
    }
}
