use tracing::{info, instrument};

use super::{degrade, require_max_len, require_non_negative, require_text};
use crate::{
    app_error::AppError,
    auth::{Access, CurrentUser, authorize},
    models::{
        CategoryEntity, CreateCategoryEntity, CreateProductEntity, ProductEntity,
        UpdateCategoryEntity, UpdateProductEntity, limits,
    },
    store::Store,
};

// Categories

pub async fn list_categories(store: &dyn Store) -> Result<Vec<CategoryEntity>, AppError> {
    degrade(store.active_categories().await, "list categories")
}

pub async fn category_by_slug(store: &dyn Store, slug: &str) -> Result<CategoryEntity, AppError> {
    degrade(store.category_by_slug(slug).await, "get category")?.ok_or(AppError::NotFound)
}

#[instrument(skip_all, fields(caller = caller.id(), slug = %input.slug))]
pub async fn create_category(
    store: &dyn Store,
    caller: &CurrentUser,
    input: CreateCategoryEntity,
) -> Result<CategoryEntity, AppError> {
    authorize(Some(caller), Access::Admin)?;
    check_category_text(Some(&input.name), Some(&input.slug), input.icon.as_deref())?;

    let category = store.create_category(input).await?;
    info!("Category #{} created", category.id);
    Ok(category)
}

#[instrument(skip_all, fields(caller = caller.id(), category_id = id))]
pub async fn update_category(
    store: &dyn Store,
    caller: &CurrentUser,
    id: i32,
    patch: UpdateCategoryEntity,
) -> Result<CategoryEntity, AppError> {
    authorize(Some(caller), Access::Admin)?;
    if patch.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }
    check_category_text(
        patch.name.as_deref(),
        patch.slug.as_deref(),
        patch.icon.as_deref(),
    )?;

    let category = store.update_category(id, patch).await?;
    info!("Category #{} updated", category.id);
    Ok(category)
}

fn check_category_text(
    name: Option<&str>,
    slug: Option<&str>,
    icon: Option<&str>,
) -> Result<(), AppError> {
    if let Some(name) = name {
        require_text(name, "name")?;
        require_max_len(name, limits::CATEGORY_NAME, "name")?;
    }
    if let Some(slug) = slug {
        require_text(slug, "slug")?;
        require_max_len(slug, limits::CATEGORY_SLUG, "slug")?;
    }
    if let Some(icon) = icon {
        require_max_len(icon, limits::CATEGORY_ICON, "icon")?;
    }
    Ok(())
}

/// Hard delete. Products of the category are removed with it.
#[instrument(skip_all, fields(caller = caller.id(), category_id = id))]
pub async fn delete_category(
    store: &dyn Store,
    caller: &CurrentUser,
    id: i32,
) -> Result<CategoryEntity, AppError> {
    authorize(Some(caller), Access::Admin)?;

    let category = store.delete_category(id).await?;
    info!("Category #{} deleted", category.id);
    Ok(category)
}

// Products

pub async fn list_products(store: &dyn Store) -> Result<Vec<ProductEntity>, AppError> {
    degrade(store.active_products().await, "list products")
}

pub async fn products_by_category(
    store: &dyn Store,
    category_id: i32,
) -> Result<Vec<ProductEntity>, AppError> {
    degrade(
        store.products_by_category(category_id).await,
        "list products by category",
    )
}

pub async fn product_by_id(store: &dyn Store, id: i32) -> Result<ProductEntity, AppError> {
    degrade(store.product_by_id(id).await, "get product")?.ok_or(AppError::NotFound)
}

#[instrument(skip_all, fields(caller = caller.id(), category_id = input.category_id))]
pub async fn create_product(
    store: &dyn Store,
    caller: &CurrentUser,
    input: CreateProductEntity,
) -> Result<ProductEntity, AppError> {
    authorize(Some(caller), Access::Admin)?;
    require_text(&input.name, "name")?;
    require_max_len(&input.name, limits::PRODUCT_NAME, "name")?;
    require_non_negative(input.price, "price")?;
    if let Some(stock) = input.stock {
        require_non_negative(stock, "stock")?;
    }

    let product = store.create_product(input).await?;
    info!("Product #{} created", product.id);
    Ok(product)
}

#[instrument(skip_all, fields(caller = caller.id(), product_id = id))]
pub async fn update_product(
    store: &dyn Store,
    caller: &CurrentUser,
    id: i32,
    patch: UpdateProductEntity,
) -> Result<ProductEntity, AppError> {
    authorize(Some(caller), Access::Admin)?;
    if patch.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }
    if let Some(name) = &patch.name {
        require_text(name, "name")?;
        require_max_len(name, limits::PRODUCT_NAME, "name")?;
    }
    if let Some(price) = patch.price {
        require_non_negative(price, "price")?;
    }
    if let Some(stock) = patch.stock {
        require_non_negative(stock, "stock")?;
    }

    let product = store.update_product(id, patch).await?;
    info!("Product #{} updated", product.id);
    Ok(product)
}

#[instrument(skip_all, fields(caller = caller.id(), product_id = id))]
pub async fn delete_product(
    store: &dyn Store,
    caller: &CurrentUser,
    id: i32,
) -> Result<ProductEntity, AppError> {
    authorize(Some(caller), Access::Admin)?;

    let product = store.delete_product(id).await?;
    info!("Product #{} deleted", product.id);
    Ok(product)
}
