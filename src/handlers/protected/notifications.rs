use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::super::PageQuery;
use crate::auth::Principal;
use crate::database::models::{Notification, NotificationType};
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::services::notification_service::NotificationList;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct ShopNotificationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<NotificationType>,
}

/// GET /api/notifications
pub async fn notification_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> ApiResult<NotificationList> {
    let page = PageQuery { page: query.page, limit: query.limit }.request();
    Ok(ApiResponse::success(state.notifications.list(&principal, query.unread_only, page).await?))
}

/// PUT /api/notifications/:id/read
pub async fn notification_read(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Notification> {
    let notification = state.notifications.mark_read(&principal, id).await?;
    Ok(ApiResponse::success(notification).with_message("Notification marked as read"))
}

/// PUT /api/notifications/read-all
pub async fn notification_read_all(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    let updated = state.notifications.mark_all_read(&principal).await?;
    Ok(ApiResponse::success(json!({ "updated": updated })).with_message("All notifications marked as read"))
}

/// DELETE /api/notifications/:id
pub async fn notification_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    state.notifications.delete(&principal, id).await?;
    Ok(ApiResponse::message_only("Notification deleted successfully"))
}

/// GET /api/notifications/shop/:shop_id
pub async fn shop_notifications(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(shop_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ShopNotificationQuery>,
) -> ApiResult<NotificationList> {
    let page = PageQuery { page: query.page, limit: query.limit }.request();
    let list = state
        .notifications
        .list_for_shop(&principal, shop_id, query.kind, page)
        .await?;
    Ok(ApiResponse::success(list))
}
