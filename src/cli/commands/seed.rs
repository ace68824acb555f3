use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::{self, StoreBackend};
use crate::database::models::{Category, Role};
use crate::database::{self, Collection, DocumentStore, Repository};
use crate::services::auth_service::Registration;
use crate::services::category_service::NewCategory;
use crate::services::{AuthService, CategoryService};

const DEFAULT_CATALOG: &str = include_str!("../default_catalog.yaml");

#[derive(Args, Debug)]
pub struct SeedArgs {
    #[arg(long, default_value = "admin@storefront.local", help = "Super admin email")]
    pub email: String,

    #[arg(long, default_value = "admin123456", help = "Super admin password")]
    pub password: String,

    #[arg(long, default_value = "Super Admin", help = "Super admin display name")]
    pub name: String,

    #[arg(long, help = "YAML category tree to load instead of the built-in one")]
    pub catalog: Option<PathBuf>,
}

/// One node of a seed category tree
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCategory {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub children: Vec<SeedCategory>,
}

pub fn parse_catalog(yaml: &str) -> anyhow::Result<Vec<SeedCategory>> {
    serde_yaml::from_str(yaml).context("invalid category catalog")
}

pub fn default_catalog() -> anyhow::Result<Vec<SeedCategory>> {
    parse_catalog(DEFAULT_CATALOG)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub categories_created: usize,
}

/// Creates the super admin and the category tree, skipping what already exists.
///
/// Categories are matched by name under the same parent.
pub async fn seed(
    store: Arc<dyn DocumentStore>,
    admin: Registration,
    catalog: &[SeedCategory],
) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    let auth = AuthService::new(store.clone());
    if auth.find_by_email(&admin.email).await?.is_none() {
        let user = auth.create_user(admin, Role::SuperAdmin).await?;
        info!("Created super admin {}", user.email);
        report.admin_created = true;
    } else {
        info!("Super admin {} already exists", admin.email);
    }

    let service = CategoryService::new(store.clone());
    let categories = Repository::<Category>::new(Collection::Categories, store);

    // Depth-first, parents before children
    let mut pending: Vec<(Option<Uuid>, &SeedCategory)> = catalog.iter().rev().map(|c| (None, c)).collect();
    while let Some((parent, node)) = pending.pop() {
        let existing = categories
            .select_one(json!({ "name": node.name, "parent": parent, "isActive": true }))
            .await?;
        let id = match existing {
            Some(category) => category.id,
            None => {
                let created = service
                    .create(NewCategory {
                        name: node.name.clone(),
                        description: node.description.clone(),
                        image: None,
                        parent,
                        sort_order: node.sort_order,
                    })
                    .await?;
                report.categories_created += 1;
                created.id
            }
        };
        pending.extend(node.children.iter().rev().map(|child| (Some(id), child)));
    }

    Ok(report)
}

pub async fn handle(args: SeedArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    if config.store.backend == StoreBackend::Memory {
        warn!("Seeding the in-memory store; nothing will persist after this command exits");
    }

    let catalog = match &args.catalog {
        Some(path) => {
            let yaml = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            parse_catalog(&yaml)?
        }
        None => default_catalog()?,
    };

    let store = database::connect(&config.store).await?;
    let admin = Registration {
        full_name: args.name,
        email: args.email.clone(),
        password: args.password,
        phone: "0000000000".to_string(),
    };
    let report = seed(store, admin, &catalog).await?;

    output_success(
        output_format,
        "Seeding completed",
        Some(json!({
            "admin": args.email,
            "adminCreated": report.admin_created,
            "categoriesCreated": report.categories_created,
        })),
    )
}
