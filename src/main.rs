// src/main.rs
mod analytics;
mod catalog;
mod db;
mod error;
mod handlers;
mod models;
mod reports;
mod responses;
mod routes;

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv().ok(); // Load environment variables from .env file

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("survey_backend=info,tower_http=info")),
        )
        .init();

    // Get the port from the environment (default to 3030 for local development)
    let port = env::var("PORT").unwrap_or_else(|_| "3030".to_string());
    let port = port.parse::<u16>().expect("PORT must be a valid number");

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = db::create_pool(&database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    let app = routes::create_router(pool);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {addr}");
    axum_server::bind(addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("server error");
}
