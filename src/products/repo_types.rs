use serde::Serialize;
use sqlx::FromRow;

/// Raw `products` row. Only active rows are ever selected.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub product_id: i64,
    pub name: String,
    pub path: String,
    pub price: i64,
    pub stock: i32,
    pub brand_id: i64,
}

/// An active catalog product. The active flag never leaves the store.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub image_path: String,
    pub price: i64,
    pub stock: i32,
    pub brand_id: i64,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.product_id,
            name: r.name,
            image_path: r.path,
            price: r.price,
            stock: r.stock,
            brand_id: r.brand_id,
        }
    }
}

/// Fields overwritten by an update. Brand and active flag are not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub image_path: String,
    pub price: i64,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub fields: ProductFields,
    pub brand_id: i64,
}
