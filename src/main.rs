use std::sync::Arc;

use anyhow::Result;
use arcade_storefront::{
    app_state::AppState,
    bootstrap, config, db, seed,
    store::{PgStore, Store},
};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_env();
    bootstrap::init_tracing();

    let config = config::load()?;
    if config.auth.session_secret.is_none() {
        tracing::warn!("SESSION_SECRET is not set, every request will be anonymous");
    }

    let store: Arc<dyn Store> = match &config.database.url {
        Some(url) => {
            tracing::info!("Running migrations...");
            let migrations_count = db::run_migrations_blocking(MIGRATIONS, url).await?;
            tracing::info!("Run {} new migrations successfully", migrations_count);

            Arc::new(PgStore::connect(url, config.database.max_connections).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, running without a database");
            Arc::new(PgStore::unavailable())
        }
    };

    if config.seed_db {
        if config.database.url.is_some() {
            tracing::info!("Seeding database...");
            seed::run(store.as_ref(), &config).await?;
        } else {
            tracing::warn!("SEED_DB is set but there is no database to seed");
        }
    }

    tracing::info!("Bootstrapping...");
    let server = config.server.clone();
    let app = bootstrap::app(AppState::new(store, config));
    bootstrap::serve("Storefront", app, &server).await?;
    Ok(())
}
