use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use devgate::capability::{self, Action};
use devgate::notification::webhook::WebhookNotifier;
use devgate::store::postgres::PgStore;
use devgate::{api, cli, config, issuer, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "devgate=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::Token { command }) => handle_token_command(&cfg, command),
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let store = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    store.migrate().await?;

    let state = Arc::new(AppState {
        store: Arc::new(store),
        notifier: WebhookNotifier::new(),
        config: cfg,
    });

    let app = api::app(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("devgate listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Middleware: injects a unique x-request-id into every response.
/// This allows operators to correlate errors with gateway logs.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Middleware: injects security headers into every response.
/// Capability tokens travel in URLs, so referrer and cache leakage matter
/// more here than usual.
async fn security_headers_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    // Prevent MIME-type sniffing
    headers.insert("X-Content-Type-Options", "nosniff".parse().unwrap());

    // Prevent clickjacking by disallowing iframe embedding
    headers.insert("X-Frame-Options", "DENY".parse().unwrap());

    // Never cache responses to token-bearing URLs
    headers.insert("Cache-Control", "no-store".parse().unwrap());

    // Strip Referrer so tokens in URLs don't leak to linked resources
    headers.insert("Referrer-Policy", "no-referrer".parse().unwrap());

    // Remove server identity header
    headers.remove("Server");

    resp
}

fn handle_token_command(cfg: &config::Config, cmd: cli::TokenCommands) -> anyhow::Result<()> {
    let secret = cfg
        .signing_secret()
        .ok_or_else(|| anyhow::anyhow!("DEVGATE_TOKEN_SECRET is not set"))?;

    match cmd {
        cli::TokenCommands::Mint {
            device_id,
            action,
            ttl,
        } => {
            let ttl = ttl.unwrap_or(cfg.token_ttl_secs);
            let now = chrono::Utc::now();
            let actions: Vec<Action> = match action {
                Some(a) => vec![a.parse::<Action>()?],
                None => Action::ALL.to_vec(),
            };
            for action in actions {
                let token = capability::mint(secret, &device_id, action, now, ttl)?;
                println!(
                    "{}:\n  {}",
                    action,
                    issuer::action_link(&cfg.public_url, &device_id, action, &token)
                );
            }
            println!("Tokens expire in {} seconds.", ttl);
        }
        cli::TokenCommands::Inspect {
            device_id,
            action,
            token,
        } => {
            let action = action.parse::<Action>()?;
            match capability::verify(secret, &token, &device_id, action, chrono::Utc::now()) {
                Ok(claims) => println!(
                    "Token valid:\n  deviceId: {}\n  action:   {}\n  expires:  {}",
                    claims.device_id, claims.action, claims.exp
                ),
                Err(reason) => println!("Token rejected: {:?}", reason),
            }
        }
    }
    Ok(())
}
