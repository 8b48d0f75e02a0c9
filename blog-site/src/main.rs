use anyhow::Context;
use tracing::{info, warn};

use blog_site::data::Repositories;
use blog_site::infrastructure::config::{AppConfig, StorageBackend};
use blog_site::infrastructure::database::{create_pool, run_migrations};
use blog_site::infrastructure::logging::init_logging;
use blog_site::server::{AppServices, start_server};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let repos = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = create_pool(url)
                .await
                .context("failed to connect to database")?;
            run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            Repositories::postgres(pool)
        }
        StorageBackend::Memory => {
            warn!("using in-memory storage, data is lost on shutdown");
            Repositories::in_memory()
        }
    };

    let services = AppServices::new(&repos, &config).context("failed to load templates")?;

    if let Some(admin) = &config.admin {
        let user = services
            .auth
            .ensure_admin(admin)
            .await
            .context("failed to create bootstrap admin")?;
        info!(username = %user.username, "bootstrap admin ready");
    }

    start_server(services, config).await
}
