use axum::{http::Method, response::Html, routing::get, Router};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sticker_press::handlers::{health, sticker};
use sticker_press::services::file_storage::FileStorageService;
use sticker_press::services::transform::TransformService;
use sticker_press::utils::config::AppConfig;
use sticker_press::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sticker_press=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sticker Press server");

    // Load configuration
    let config = AppConfig::from_env();
    tracing::info!("Configuration loaded: {:?}", config);

    // Initialize file storage service
    let storage_service = FileStorageService::new(
        &config.temp_dir,
        Duration::from_secs(config.temp_file_max_age_seconds),
    )
    .map_err(|e| {
        tracing::error!("Failed to initialize file storage: {}", e);
        e
    })?;

    // Start the sweep that catches files interrupted requests left behind
    let cleanup_storage = storage_service.clone();
    let cleanup_interval = config.cleanup_interval_seconds;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cleanup_interval));
        loop {
            interval.tick().await;
            if let Err(e) = cleanup_storage.cleanup_temp_files().await {
                tracing::error!("Failed to cleanup temporary files: {}", e);
            }
        }
    });

    // Create shared state
    let app_state = AppState {
        config: Arc::new(config.clone()),
        storage: Arc::new(storage_service),
        transform: Arc::new(TransformService::new()),
    };

    // Create CORS layer
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    // Build the application router
    let app = Router::new()
        // Health check endpoint
        .route("/health", get(health::health_check))
        // Image upload and conversion endpoint
        .route("/upload", axum::routing::post(sticker::create_sticker))
        // Fallback route serving the upload form
        .fallback(fallback_handler)
        // Serve static files
        .nest_service("/static", ServeDir::new("static"))
        // Add shared state
        .with_state(app_state)
        // Add middleware layers
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_seconds,
                )))
                .layer(cors),
        );

    // Parse the bind address
    let addr: SocketAddr = config.bind_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    // Create the server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn fallback_handler() -> Html<&'static str> {
    Html(
        r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Sticker Press</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            max-width: 800px;
            margin: 0 auto;
            padding: 2rem;
            background: #f5f5f5;
        }
        .container {
            background: white;
            padding: 2rem;
            border-radius: 8px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
        }
        h1 {
            color: #333;
            text-align: center;
        }
        .controls {
            display: flex;
            flex-wrap: wrap;
            gap: 1rem;
            align-items: center;
            margin: 1rem 0;
        }
        .controls label {
            color: #555;
        }
        #preview-section img, #preview-section canvas {
            max-width: 100%;
            border: 1px solid #ddd;
            border-radius: 4px;
            margin-top: 0.5rem;
        }
        button {
            background: #4a7cff;
            border: none;
            color: white;
            padding: 0.6rem 1.4rem;
            border-radius: 4px;
            cursor: pointer;
        }
        button:disabled {
            background: #aaa;
            cursor: default;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Sticker Press</h1>
        <p>Upload a PNG or JPEG, key out the bright background, and download the result.</p>
        <form id="sticker-form" action="/upload" method="post" enctype="multipart/form-data">
            <div class="controls">
                <input type="file" id="image-input" name="image" accept="image/png,image/jpeg" required>
            </div>
            <div class="controls">
                <label>Mode
                    <select name="mode" id="mode-select">
                        <option value="keyout" selected>Key out background</option>
                        <option value="flatten">Flatten alpha</option>
                    </select>
                </label>
                <label>Threshold
                    <input type="number" name="threshold" id="threshold-input" min="0" max="765" value="600">
                </label>
                <label>
                    <input type="checkbox" name="outline" id="outline-input" value="true">
                    Outline
                </label>
            </div>
            <div class="controls">
                <button type="submit" id="convert-button" disabled>Convert</button>
            </div>
        </form>
        <div id="preview-section"></div>
    </div>
    <script src="/static/app.js"></script>
</body>
</html>
    "#,
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
