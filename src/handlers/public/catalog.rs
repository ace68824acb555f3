use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use super::super::PageQuery;
use crate::api::Paginated;
use crate::database::models::{Category, CategoryNode, ProductListing, Shop};
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::services::category_service::{CategoryDetails, CategoryProducts};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<Uuid>,
    pub shop: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub parent: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryProductQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub shop: Option<Uuid>,
}

/// GET /shops/:id
pub async fn shop_get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Shop> {
    Ok(ApiResponse::success(state.shops.get(id).await?))
}

/// GET /products - active products, newest first
pub async fn product_list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Paginated<ProductListing>> {
    let page = PageQuery { page: query.page, limit: query.limit }.request();
    let products = state.products.list(query.category, query.shop, page).await?;
    Ok(ApiResponse::success(products))
}

/// GET /products/:id
pub async fn product_get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<ProductListing> {
    Ok(ApiResponse::success(state.products.get(id).await?))
}

/// GET /categories - active categories, optionally the children of `parent`
pub async fn category_list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> ApiResult<Vec<Category>> {
    Ok(ApiResponse::success(state.categories.list(query.parent).await?))
}

/// GET /categories/tree
pub async fn category_tree(State(state): State<AppState>) -> ApiResult<Vec<CategoryNode>> {
    Ok(ApiResponse::success(state.categories.tree().await?))
}

/// GET /categories/:id
pub async fn category_get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<CategoryDetails> {
    Ok(ApiResponse::success(state.categories.get(id).await?))
}

/// GET /categories/:id/products - products anywhere under the category
pub async fn category_products(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<CategoryProductQuery>,
) -> ApiResult<CategoryProducts> {
    let page = PageQuery { page: query.page, limit: query.limit }.request();
    Ok(ApiResponse::success(state.categories.products(id, query.shop, page).await?))
}
