use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::error::{ServiceError, ServiceResult};
use super::product_service::attach_shops;
use crate::api::{PageRequest, Pagination};
use crate::database::models::{Category, CategoryNode, Product, ProductListing, Shop};
use crate::database::{Collection, DocumentStore, Repository};
use crate::filter::FilterData;
use crate::types::{double_option, now, timestamp};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(url(message = "Invalid image URL"))]
    pub image: Option<String>,
    pub parent: Option<Uuid>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(url(message = "Invalid image URL"))]
    pub image: Option<String>,
    /// `null` moves the category to the root level
    #[serde(default, deserialize_with = "double_option")]
    pub parent: Option<Option<Uuid>>,
    pub sort_order: Option<i32>,
}

/// A category with its direct active children
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetails {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<Category>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryProducts {
    pub category: Category,
    pub products: Vec<ProductListing>,
    pub pagination: Pagination,
}

/// Assembles active categories into a forest.
///
/// Siblings are ordered by `(sortOrder, name)`. A category whose parent is not
/// among `categories` is unreachable from any root and is left out together
/// with its subtree.
pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let mut categories: Vec<Category> = categories.into_iter().filter(|c| c.is_active).collect();
    categories.sort_by(Category::sibling_cmp);

    let index: HashMap<Uuid, usize> = categories.iter().enumerate().map(|(i, c)| (c.id, i)).collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); categories.len()];
    let mut roots = Vec::new();
    for (i, category) in categories.iter().enumerate() {
        match category.parent {
            None => roots.push(i),
            Some(parent) => match index.get(&parent) {
                Some(&p) => children[p].push(i),
                None => debug!("Category {} has no active parent {}, leaving it out of the tree", category.id, parent),
            },
        }
    }

    // Preorder from the roots; every child comes after its parent
    let mut preorder = Vec::with_capacity(categories.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        preorder.push(i);
        stack.extend(children[i].iter().rev());
    }

    // Build bottom-up so each node's children are finished before it
    let mut slots: Vec<Option<Category>> = categories.into_iter().map(Some).collect();
    let mut built: HashMap<usize, CategoryNode> = HashMap::with_capacity(preorder.len());
    for &i in preorder.iter().rev() {
        let node_children: Vec<CategoryNode> = children[i].iter().filter_map(|c| built.remove(c)).collect();
        if let Some(category) = slots[i].take() {
            built.insert(i, CategoryNode { category, children: node_children });
        }
    }

    roots.iter().filter_map(|r| built.remove(r)).collect()
}

/// `root` followed by every category reachable below it through `categories`.
/// Each id appears once even if the parent links contain a cycle.
pub fn collect_descendants(root: Uuid, categories: &[Category]) -> Vec<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for category in categories {
        if let Some(parent) = category.parent {
            children.entry(parent).or_default().push(category.id);
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        out.push(id);
        if let Some(kids) = children.get(&id) {
            stack.extend(kids.iter().rev());
        }
    }
    out
}

#[derive(Clone)]
pub struct CategoryService {
    categories: Repository<Category>,
    products: Repository<Product>,
    shops: Repository<Shop>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            categories: Repository::new(Collection::Categories, store.clone()),
            products: Repository::new(Collection::Products, store.clone()),
            shops: Repository::new(Collection::Shops, store),
        }
    }

    async fn all_active(&self) -> ServiceResult<Vec<Category>> {
        Ok(self
            .categories
            .select_any(FilterData::matching(json!({ "isActive": true })).order("sortOrder, name"))
            .await?)
    }

    async fn active(&self, id: Uuid) -> ServiceResult<Category> {
        self.categories
            .select_id(id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| ServiceError::not_found("Category not found"))
    }

    async fn active_parent(&self, id: Uuid) -> ServiceResult<Category> {
        self.categories
            .select_id(id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| ServiceError::not_found("Parent category not found"))
    }

    /// Active categories, optionally restricted to the children of `parent`
    pub async fn list(&self, parent: Option<Uuid>) -> ServiceResult<Vec<Category>> {
        let mut filter = json!({ "isActive": true });
        if let Some(parent) = parent {
            filter["parent"] = json!(parent);
        }
        Ok(self
            .categories
            .select_any(FilterData::matching(filter).order("sortOrder, name"))
            .await?)
    }

    pub async fn tree(&self) -> ServiceResult<Vec<CategoryNode>> {
        Ok(build_tree(self.all_active().await?))
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<CategoryDetails> {
        let category = self.active(id).await?;
        let children = self.list(Some(id)).await?;
        Ok(CategoryDetails { category, children })
    }

    /// The category plus all of its active descendants. The category itself
    /// must be active.
    pub async fn resolve_descendant_ids(&self, id: Uuid) -> ServiceResult<Vec<Uuid>> {
        self.active(id).await?;
        let ids = collect_descendants(id, &self.all_active().await?);
        debug!("Category {} spans {} categories", id, ids.len());
        Ok(ids)
    }

    /// Active products in the category's subtree, newest first
    pub async fn products(&self, id: Uuid, shop: Option<Uuid>, page: PageRequest) -> ServiceResult<CategoryProducts> {
        let category = self.active(id).await?;
        let ids = self.resolve_descendant_ids(id).await?;

        let mut filter = json!({ "category": { "$in": ids }, "isActive": true });
        if let Some(shop) = shop {
            filter["shop"] = json!(shop);
        }

        let products = self.products.select_any(page.filter(filter.clone(), "createdAt desc")).await?;
        let total = self.products.count(filter).await?;
        let pagination = Pagination::new(&page, products.len(), total);
        let products = attach_shops(&self.shops, products).await?;

        Ok(CategoryProducts { category, products, pagination })
    }

    pub async fn create(&self, input: NewCategory) -> ServiceResult<Category> {
        if let Some(parent) = input.parent {
            self.active_parent(parent).await?;
        }

        let now = now();
        let category = Category {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            image: input.image,
            parent: input.parent,
            sort_order: input.sort_order,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let category = self.categories.insert(&category).await?;
        info!("Created category {} ({})", category.name, category.id);
        Ok(category)
    }

    pub async fn update(&self, id: Uuid, patch: CategoryPatch) -> ServiceResult<Category> {
        self.active(id).await?;

        let mut changes = Map::new();
        if let Some(parent) = patch.parent {
            if let Some(parent_id) = parent {
                if parent_id == id {
                    return Err(ServiceError::field("parent", "A category cannot be its own parent"));
                }
                self.active_parent(parent_id).await?;
                let subtree = collect_descendants(id, &self.all_active().await?);
                if subtree.contains(&parent_id) {
                    warn!("Rejected moving category {} under its descendant {}", id, parent_id);
                    return Err(ServiceError::field(
                        "parent",
                        "A category cannot be moved under one of its descendants",
                    ));
                }
            }
            changes.insert("parent".into(), json!(parent));
        }
        if let Some(name) = patch.name {
            changes.insert("name".into(), json!(name));
        }
        if let Some(description) = patch.description {
            changes.insert("description".into(), json!(description));
        }
        if let Some(image) = patch.image {
            changes.insert("image".into(), json!(image));
        }
        if let Some(sort_order) = patch.sort_order {
            changes.insert("sortOrder".into(), json!(sort_order));
        }
        changes.insert("updatedAt".into(), json!(timestamp::format(&now())));

        self.categories
            .update(id, Value::Object(changes))
            .await?
            .ok_or_else(|| ServiceError::not_found("Category not found"))
    }

    /// Soft delete, refused while active children or products reference the category
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.active(id).await?;

        let children = self.categories.count(json!({ "parent": id, "isActive": true })).await?;
        if children > 0 {
            return Err(ServiceError::conflict("Cannot delete category with subcategories"));
        }
        let products = self.products.count(json!({ "category": id, "isActive": true })).await?;
        if products > 0 {
            return Err(ServiceError::conflict("Cannot delete category with products"));
        }

        self.categories
            .update(id, json!({ "isActive": false, "updatedAt": timestamp::format(&now()) }))
            .await?;
        info!("Deactivated category {}", id);
        Ok(())
    }
}
