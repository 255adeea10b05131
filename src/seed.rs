use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::{
    config::AppConfig,
    models::{CreateCategoryEntity, CreateProductEntity},
    services::users::{self, UserProfile},
    store::Store,
};

struct SeedCategory {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
    icon: &'static str,
    display_order: i32,
}

struct SeedProduct {
    category_slug: &'static str,
    name: &'static str,
    description: &'static str,
    price: i32,
    stock: i32,
}

const CATEGORIES: &[SeedCategory] = &[
    SeedCategory {
        name: "سيارات",
        slug: "cars",
        description: "سيارات متنوعة",
        icon: "🚗",
        display_order: 1,
    },
    SeedCategory {
        name: "بكجات",
        slug: "packages",
        description: "بكجات مميزة",
        icon: "📦",
        display_order: 2,
    },
    SeedCategory {
        name: "اولوية",
        slug: "priority",
        description: "خدمات الأولوية",
        icon: "⭐",
        display_order: 3,
    },
    SeedCategory {
        name: "ورشات",
        slug: "workshops",
        description: "ورشات العمل",
        icon: "🔧",
        display_order: 4,
    },
    SeedCategory {
        name: "مطاعم",
        slug: "restaurants",
        description: "مطاعم ومقاهي",
        icon: "🍔",
        display_order: 5,
    },
    SeedCategory {
        name: "الشخصيات",
        slug: "characters",
        description: "شخصيات مميزة",
        icon: "👤",
        display_order: 6,
    },
];

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        category_slug: "cars",
        name: "سيارة رياضية",
        description: "سيارة رياضية سريعة",
        price: 50000,
        stock: 10,
    },
    SeedProduct {
        category_slug: "cars",
        name: "سيارة فاخرة",
        description: "سيارة فاخرة مريحة",
        price: 80000,
        stock: 5,
    },
    SeedProduct {
        category_slug: "packages",
        name: "بكج المبتدئين",
        description: "بكج شامل للمبتدئين",
        price: 10000,
        stock: 50,
    },
    SeedProduct {
        category_slug: "packages",
        name: "بكج المحترفين",
        description: "بكج متقدم للمحترفين",
        price: 25000,
        stock: 30,
    },
    SeedProduct {
        category_slug: "priority",
        name: "أولوية VIP",
        description: "خدمة أولوية VIP",
        price: 15000,
        stock: 20,
    },
    SeedProduct {
        category_slug: "workshops",
        name: "ورشة ميكانيكا",
        description: "ورشة ميكانيكا متكاملة",
        price: 35000,
        stock: 8,
    },
];

/// Fills an empty catalog with the starter categories and products, and makes
/// sure the owner account exists. Running it against a seeded catalog only
/// touches the owner.
#[instrument(skip_all)]
pub async fn run(store: &dyn Store, config: &AppConfig) -> Result<()> {
    if let Some(owner) = &config.auth.owner_open_id {
        users::sync_user(
            store,
            &config.auth,
            UserProfile {
                open_id: owner.clone(),
                ..Default::default()
            },
        )
        .await
        .context("Failed to seed the owner account")?;
    }

    let already_seeded = store
        .category_by_slug(CATEGORIES[0].slug)
        .await
        .context("Failed to inspect the catalog")?
        .is_some();
    if already_seeded {
        info!("Catalog already seeded, skipping");
        return Ok(());
    }

    for category in CATEGORIES {
        store
            .create_category(CreateCategoryEntity {
                name: category.name.into(),
                slug: category.slug.into(),
                description: Some(category.description.into()),
                icon: Some(category.icon.into()),
                display_order: Some(category.display_order),
            })
            .await
            .with_context(|| format!("Failed to seed category {}", category.slug))?;
    }

    for product in PRODUCTS {
        let category = store
            .category_by_slug(product.category_slug)
            .await?
            .with_context(|| format!("Seeded category {} is missing", product.category_slug))?;
        store
            .create_product(CreateProductEntity {
                category_id: category.id,
                name: product.name.into(),
                description: Some(product.description.into()),
                price: product.price,
                image_url: None,
                stock: Some(product.stock),
            })
            .await
            .with_context(|| format!("Failed to seed product {}", product.name))?;
    }

    info!(
        "Seeded {} categories and {} products",
        CATEGORIES.len(),
        PRODUCTS.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::MockStore;

    fn config(owner: Option<&str>) -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.owner_open_id = owner.map(String::from);
        config.seed_db = true;
        config
    }

    #[tokio::test]
    async fn seeds_the_catalog_once() {
        let store = MockStore::new();
        let config = config(None);

        run(&store, &config).await.unwrap();
        run(&store, &config).await.unwrap();

        let categories = store.active_categories().await.unwrap();
        let slugs: Vec<&str> = categories.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec!["cars", "packages", "priority", "workshops", "restaurants", "characters"]
        );
        assert_eq!(store.active_products().await.unwrap().len(), PRODUCTS.len());

        let cars = store.category_by_slug("cars").await.unwrap().unwrap();
        assert_eq!(store.products_by_category(cars.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn owner_account_is_created_as_admin() {
        let store = MockStore::new();

        run(&store, &config(Some("owner-1"))).await.unwrap();

        let owner = store.user_by_open_id("owner-1").await.unwrap().unwrap();
        assert_eq!(owner.role(), Role::Admin);
    }
}
