use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use crate::api::{PageRequest, Pagination};
use crate::auth::{authorize, Action, Principal, Resource};
use crate::database::models::{Notification, NotificationType};
use crate::database::{Collection, DocumentStore, Repository};
use crate::types::{now, timestamp};

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user: Uuid,
    pub shop: Uuid,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub items: Vec<Notification>,
    pub unread_count: u64,
    pub pagination: Pagination,
}

#[derive(Clone)]
pub struct NotificationService {
    notifications: Repository<Notification>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            notifications: Repository::new(Collection::Notifications, store),
        }
    }

    pub async fn create(&self, input: NewNotification) -> ServiceResult<Notification> {
        let now = now();
        let notification = Notification {
            id: Uuid::new_v4(),
            user: input.user,
            shop: input.shop,
            kind: input.kind,
            title: input.title,
            message: input.message,
            data: input.data,
            is_read: false,
            read_at: None,
            created_at: now,
            updated_at: now,
        };
        let notification = self.notifications.insert(&notification).await?;
        debug!("Stored {} notification for user {}", notification.kind.as_str(), notification.user);
        Ok(notification)
    }

    async fn owned(&self, principal: &Principal, id: Uuid) -> ServiceResult<Notification> {
        let notification = self
            .notifications
            .select_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Notification not found"))?;
        authorize(principal, Resource::Notification { owner: notification.user }, Action::Manage)?;
        Ok(notification)
    }

    /// The caller's notifications, newest first, with their unread total
    pub async fn list(&self, principal: &Principal, unread_only: bool, page: PageRequest) -> ServiceResult<NotificationList> {
        let mut filter = json!({ "user": principal.id });
        if unread_only {
            filter["isRead"] = json!(false);
        }

        let items = self.notifications.select_any(page.filter(filter.clone(), "createdAt desc")).await?;
        let total = self.notifications.count(filter).await?;
        let unread_count = self
            .notifications
            .count(json!({ "user": principal.id, "isRead": false }))
            .await?;

        let pagination = Pagination::new(&page, items.len(), total);
        Ok(NotificationList { items, unread_count, pagination })
    }

    pub async fn mark_read(&self, principal: &Principal, id: Uuid) -> ServiceResult<Notification> {
        self.owned(principal, id).await?;
        let stamp = timestamp::format(&now());
        self.notifications
            .update(id, json!({ "isRead": true, "readAt": stamp, "updatedAt": stamp }))
            .await?
            .ok_or_else(|| ServiceError::not_found("Notification not found"))
    }

    pub async fn mark_all_read(&self, principal: &Principal) -> ServiceResult<u64> {
        let stamp = timestamp::format(&now());
        Ok(self
            .notifications
            .update_many(
                json!({ "user": principal.id, "isRead": false }),
                json!({ "isRead": true, "readAt": stamp, "updatedAt": stamp }),
            )
            .await?)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> ServiceResult<()> {
        self.owned(principal, id).await?;
        self.notifications.delete(id).await?;
        Ok(())
    }

    /// Notifications raised for a shop, for the shop's managers
    pub async fn list_for_shop(
        &self,
        principal: &Principal,
        shop: Uuid,
        kind: Option<NotificationType>,
        page: PageRequest,
    ) -> ServiceResult<NotificationList> {
        authorize(principal, Resource::Shop(shop), Action::Read)?;

        let mut filter = json!({ "shop": shop });
        if let Some(kind) = kind {
            filter["type"] = json!(kind);
        }
        let items = self.notifications.select_any(page.filter(filter.clone(), "createdAt desc")).await?;
        let total = self.notifications.count(filter.clone()).await?;
        filter["isRead"] = json!(false);
        let unread_count = self.notifications.count(filter).await?;

        let pagination = Pagination::new(&page, items.len(), total);
        Ok(NotificationList { items, unread_count, pagination })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use crate::database::MemoryStore;

    fn principal() -> Principal {
        Principal { id: Uuid::new_v4(), role: Role::User, shops: vec![] }
    }

    fn note(user: Uuid) -> NewNotification {
        NewNotification {
            user,
            shop: Uuid::new_v4(),
            kind: NotificationType::OrderPlaced,
            title: "New order".into(),
            message: "Order ORD-1 placed".into(),
            data: json!({ "orderNumber": "ORD-1" }),
        }
    }

    #[tokio::test]
    async fn read_state_is_tracked_per_user() {
        let service = NotificationService::new(Arc::new(MemoryStore::new()));
        let alice = principal();
        let bob = principal();

        let first = service.create(note(alice.id)).await.unwrap();
        service.create(note(alice.id)).await.unwrap();
        service.create(note(bob.id)).await.unwrap();

        let listed = service.list(&alice, false, PageRequest::default()).await.unwrap();
        assert_eq!(listed.items.len(), 2);
        assert_eq!(listed.unread_count, 2);

        let read = service.mark_read(&alice, first.id).await.unwrap();
        assert!(read.is_read);
        assert!(read.read_at.is_some());

        // Someone else's notification looks missing
        assert!(matches!(service.mark_read(&bob, first.id).await, Err(ServiceError::NotFound(_))));

        assert_eq!(service.mark_all_read(&alice).await.unwrap(), 1);
        let unread = service.list(&alice, true, PageRequest::default()).await.unwrap();
        assert!(unread.items.is_empty());
        assert_eq!(service.list(&bob, true, PageRequest::default()).await.unwrap().unread_count, 1);
    }

    #[tokio::test]
    async fn delete_only_own_notifications() {
        let service = NotificationService::new(Arc::new(MemoryStore::new()));
        let alice = principal();
        let bob = principal();
        let n = service.create(note(alice.id)).await.unwrap();

        assert!(service.delete(&bob, n.id).await.is_err());
        service.delete(&alice, n.id).await.unwrap();
        assert!(matches!(service.delete(&alice, n.id).await, Err(ServiceError::NotFound(_))));
    }
}
