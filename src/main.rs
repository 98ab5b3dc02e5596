// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use exam_admin::config::Config;
use exam_admin::models::user::{User, UserRole};
use exam_admin::oracle::ChatCompletionOracle;
use exam_admin::routes;
use exam_admin::state::AppState;
use exam_admin::store::{self, DocumentStore, SqliteStore, collections};
use exam_admin::utils::hash::hash_password;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Document Store with Retry
    let mut retry_count = 0;
    let store = loop {
        match SqliteStore::connect(&config.database_url).await {
            Ok(store) => break store,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to open database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    store
        .init_schema()
        .await
        .expect("Failed to initialize the document schema");
    tracing::info!("Database connected...");

    let store: Arc<dyn DocumentStore> = Arc::new(store);

    // Seed Admin User
    if let Err(e) = seed_admin_user(store.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    // Create AppState
    let state = AppState {
        store,
        oracle: Arc::new(ChatCompletionOracle::new(&config)),
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}

async fn seed_admin_user(
    store: &dyn DocumentStore,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(employee_id), Some(password)) =
        (&config.admin_employee_id, &config.admin_password)
    {
        let users: Vec<User> = store::fetch_all(store, collections::USERS).await?;
        if users.iter().any(|u| &u.employee_id == employee_id) {
            return Ok(());
        }

        tracing::info!("Seeding admin user: {}", employee_id);
        let admin = User {
            id: String::new(),
            name: "システム管理者".to_string(),
            employee_id: employee_id.clone(),
            role: UserRole::SystemAdministrator,
            headquarters: None,
            password: Some(hash_password(password)?),
        };
        let body = store::to_document(&admin)?;
        store.insert(collections::USERS, body).await?;
        tracing::info!("Admin user created successfully.");
    }
    Ok(())
}
