use std::path::Path;

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{error, instrument, warn};

use super::{
    dto::{CreatedProductResponse, IdQuery, MessageResponse},
    repo_types::{NewProduct, Product, ProductFields},
    services,
};
use crate::{
    auth::{
        extractors::AuthUser,
        policy::{authorize, ProductOp},
    },
    error::AppError,
    images::services::{discard_image, save_image, UploadItem},
    state::AppState,
};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/product",
            get(get_product)
                .post(create_product)
                .patch(update_product)
                .delete(delete_product),
        )
        .route("/product/brand", get(list_by_brand))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

// --- multipart form ---

#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    price: Option<i64>,
    stock: Option<i32>,
    brand_id: Option<i64>,
    image: Option<UploadItem>,
}

impl ProductForm {
    async fn read(mp: Result<Multipart, MultipartRejection>) -> Result<Self, AppError> {
        let mut mp = mp.map_err(|e| AppError::Validation(format!("invalid data request: {e}")))?;
        let mut form = ProductForm::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("invalid data request: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "name" => form.name = Some(text(field).await?),
                "price" => form.price = Some(number(field, "price").await?),
                "stock" => form.stock = Some(number(field, "stock").await?),
                "brand_id" => form.brand_id = Some(number(field, "brand_id").await?),
                "fileImage" => {
                    let content_type = field
                        .content_type()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "application/octet-stream".into());
                    let body = field.bytes().await.map_err(|e| {
                        AppError::Validation(format!("invalid fileImage: {e}"))
                    })?;
                    form.image = Some(UploadItem { body, content_type });
                }
                _ => {}
            }
        }
        Ok(form)
    }

    /// Splits into the updatable fields (minus the image path) and the image.
    fn required(self) -> Result<(String, i64, i32, UploadItem), AppError> {
        let name = self.name.ok_or_else(|| missing("name"))?;
        let price = self.price.ok_or_else(|| missing("price"))?;
        let stock = self.stock.ok_or_else(|| missing("stock"))?;
        let image = self
            .image
            .filter(|img| !img.body.is_empty())
            .ok_or_else(|| missing("fileImage"))?;
        Ok((name, price, stock, image))
    }
}

fn missing(field: &str) -> AppError {
    AppError::Validation(format!("{field} is required"))
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("invalid data request: {e}")))
}

async fn number<T: std::str::FromStr>(field: Field<'_>, what: &str) -> Result<T, AppError> {
    text(field)
        .await?
        .trim()
        .parse::<T>()
        .map_err(|_| AppError::Validation(format!("{what} must be an integer")))
}

async fn store_image(state: &AppState, image: UploadItem) -> Result<String, AppError> {
    let path = save_image(&state.config.upload_dir, image).await.map_err(|e| {
        error!(error = ?e, "saving image failed");
        AppError::Internal(e.to_string())
    })?;
    Ok(path.to_string_lossy().into_owned())
}

/// Removes a freshly stored image once the product write is known not to have
/// happened. A cancelled write may already be committed, so its image stays.
async fn release_image(image_path: &str, err: &AppError) {
    match err {
        AppError::Validation(_) | AppError::NotFound(_) | AppError::Conflict(_) => {
            discard_image(Path::new(image_path)).await
        }
        _ => warn!(
            image_path,
            error = %err,
            "product write outcome unknown, keeping image"
        ),
    }
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(q): Query<IdQuery>,
) -> Result<Json<Product>, AppError> {
    let grant = authorize(&identity, ProductOp::Get)?;
    let id = q.parse()?;
    let ctx = state.op_ctx();
    let product = services::get_product(&grant, state.products.as_ref(), &ctx, id).await?;
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn list_by_brand(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(q): Query<IdQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let grant = authorize(&identity, ProductOp::ListByBrand)?;
    let brand_id = q.parse()?;
    let ctx = state.op_ctx();
    let products =
        services::list_by_brand(&grant, state.products.as_ref(), &ctx, brand_id).await?;
    Ok(Json(products))
}

/// POST /product (multipart: name, price, stock, brand_id, fileImage)
#[instrument(skip(state, mp))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, HeaderMap, Json<CreatedProductResponse>), AppError> {
    let grant = authorize(&identity, ProductOp::Create)?;
    let form = ProductForm::read(mp).await?;
    let brand_id = form.brand_id.ok_or_else(|| missing("brand_id"))?;
    let (name, price, stock, image) = form.required()?;

    let image_path = store_image(&state, image).await?;
    let product = NewProduct {
        fields: ProductFields {
            name,
            image_path: image_path.clone(),
            price,
            stock,
        },
        brand_id,
    };

    let ctx = state.op_ctx();
    let id = match services::create_product(&grant, state.products.as_ref(), &ctx, product).await
    {
        Ok(id) => id,
        Err(e) => {
            release_image(&image_path, &e).await;
            return Err(e);
        }
    };

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/product?id={id}"))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    headers.insert(LOCATION, location);

    Ok((
        StatusCode::CREATED,
        headers,
        Json(CreatedProductResponse {
            id,
            message: "success create",
        }),
    ))
}

/// PATCH /product?id=N (multipart: name, price, stock, fileImage). A brand_id part is ignored.
#[instrument(skip(state, mp))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(q): Query<IdQuery>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let grant = authorize(&identity, ProductOp::Update)?;
    let id = q.parse()?;
    let (name, price, stock, image) = ProductForm::read(mp).await?.required()?;

    let image_path = store_image(&state, image).await?;
    let fields = ProductFields {
        name,
        image_path: image_path.clone(),
        price,
        stock,
    };

    let ctx = state.op_ctx();
    if let Err(e) =
        services::update_product(&grant, state.products.as_ref(), &ctx, id, fields).await
    {
        release_image(&image_path, &e).await;
        return Err(e);
    }

    Ok(Json(MessageResponse {
        message: "update has been successful",
    }))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(q): Query<IdQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let grant = authorize(&identity, ProductOp::Delete)?;
    let id = q.parse()?;
    let ctx = state.op_ctx();
    services::delete_product(&grant, state.products.as_ref(), &ctx, id).await?;
    Ok(Json(MessageResponse {
        message: "Product has been deleted",
    }))
}
