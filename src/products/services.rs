use tracing::info;

use crate::{
    auth::policy::AdminGrant,
    ctx::OpCtx,
    error::AppError,
    products::{
        repo::ProductStore,
        repo_types::{NewProduct, Product, ProductFields},
    },
};

fn check_id(id: i64, what: &str) -> Result<(), AppError> {
    if id <= 0 {
        return Err(AppError::Validation(format!("{what} must be positive")));
    }
    Ok(())
}

fn check_fields(fields: &ProductFields) -> Result<(), AppError> {
    if fields.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    if fields.image_path.is_empty() {
        return Err(AppError::Validation("image is required".into()));
    }
    Ok(())
}

pub async fn get_product(
    _grant: &AdminGrant,
    store: &dyn ProductStore,
    ctx: &OpCtx,
    id: i64,
) -> Result<Product, AppError> {
    check_id(id, "id")?;
    store
        .find_active_by_id(ctx, id)
        .await
        .map_err(|e| AppError::from_store(e, "Product"))
}

pub async fn list_by_brand(
    _grant: &AdminGrant,
    store: &dyn ProductStore,
    ctx: &OpCtx,
    brand_id: i64,
) -> Result<Vec<Product>, AppError> {
    check_id(brand_id, "brand id")?;
    store
        .list_active_by_brand(ctx, brand_id)
        .await
        .map_err(|e| AppError::from_store(e, "Product"))
}

pub async fn create_product(
    grant: &AdminGrant,
    store: &dyn ProductStore,
    ctx: &OpCtx,
    product: NewProduct,
) -> Result<i64, AppError> {
    check_fields(&product.fields)?;
    check_id(product.brand_id, "brand_id")?;
    let brand_id = product.brand_id;
    let id = store
        .insert(ctx, product)
        .await
        .map_err(|e| AppError::from_store(e, "Product"))?;
    info!(product_id = id, brand_id, by = grant.user_id(), "product created");
    Ok(id)
}

/// Overwrites name, image path, price and stock of the product with this id.
pub async fn update_product(
    grant: &AdminGrant,
    store: &dyn ProductStore,
    ctx: &OpCtx,
    id: i64,
    fields: ProductFields,
) -> Result<(), AppError> {
    check_id(id, "id")?;
    check_fields(&fields)?;
    store
        .update_fields(ctx, id, &fields)
        .await
        .map_err(|e| AppError::from_store(e, "Product"))?;
    info!(product_id = id, by = grant.user_id(), "product updated");
    Ok(())
}

pub async fn delete_product(
    grant: &AdminGrant,
    store: &dyn ProductStore,
    ctx: &OpCtx,
    id: i64,
) -> Result<(), AppError> {
    check_id(id, "id")?;
    store
        .soft_delete(ctx, id)
        .await
        .map_err(|e| AppError::from_store(e, "Product"))?;
    info!(product_id = id, by = grant.user_id(), "product soft-deleted");
    Ok(())
}
