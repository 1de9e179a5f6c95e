use std::net::SocketAddr;

use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use http_workbench::{routes, Config, HttpTransport, PrefsStore, Workbench};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "http_workbench=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!("Starting HTTP workbench backend on port {}", config.port);

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create the data directory");
    }
    let store = PrefsStore::open(&config.database_path)
        .expect("Failed to open the workbench database");
    let transport = HttpTransport::arc().expect("Failed to build the HTTP transport");

    let workbench = Workbench::new(transport, store);
    match workbench.load() {
        Ok(state) => {
            tracing::info!(url = %state.form.url, "Restored the saved form")
        }
        Err(err) => tracing::warn!(error = %err, "Could not load the saved form"),
    }

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = routes::router(workbench)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.unwrap();
}
