use std::path::{Path, PathBuf};

use axum::{
    Form, Json, Router,
    extract::{Path as UrlPath, Query},
    http::HeaderMap,
    routing::{get, post},
};
use clap::Parser;
use contract_guard::{
    ContractGuard, ContractIndex, GuardConfig, GuardOptions, observability,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

/// CLI arguments for contract-guard
#[derive(Parser, Debug)]
#[command(version, about = "Swagger 2.0 contract validation for HTTP services", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Contract document (JSON or YAML); overrides `validation.contract_path`
    #[arg(long, global = true)]
    contract: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Serve the sample "thing" service behind the guard (default)
    Serve,
    /// Load the contract and report whether it is valid
    Check,
    /// List the operations declared by the contract
    Routes,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match GuardConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config from {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => GuardConfig::default(),
    };

    let Some(contract_path) = args
        .contract
        .clone()
        .or_else(|| config.validation.contract_path.clone())
    else {
        eprintln!("Error: no contract given. Use --contract or set validation.contract_path.");
        std::process::exit(1);
    };

    let contract = load_contract(&contract_path);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config, contract).await,
        Command::Check => {
            println!(
                "{}: valid swagger 2.0 contract with {} operations",
                contract_path.display(),
                contract.len()
            );
        }
        Command::Routes => {
            for operation in contract.operations() {
                match &operation.operation_id {
                    Some(id) => println!("{:<7} {}  ({})", operation.method, operation.path, id),
                    None => println!("{:<7} {}", operation.method, operation.path),
                }
            }
        }
    }
}

fn load_contract(path: &Path) -> ContractIndex {
    match ContractIndex::from_file(path) {
        Ok(contract) => contract,
        Err(e) => {
            eprintln!("Failed to load contract from {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Run the sample service
async fn run_server(config: GuardConfig, contract: ContractIndex) {
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let guard = ContractGuard::new(
        contract,
        GuardOptions {
            settings: config.validation.clone(),
            ..Default::default()
        },
    );
    let app = guard
        .install(thing_routes())
        .layer(TraceLayer::new_for_http());

    let bind_addr = config.server.socket_addr();
    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        operations = guard.contract().len(),
        "Server listening on http://{}",
        bind_addr
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[derive(Debug, Serialize, Deserialize)]
struct Thing {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl Thing {
    fn numbered(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: Some(format!("Thing{}", id)),
            id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ThingId {
    thing_id: String,
}

/// The sample service described by `demos/swagger.yml`.
fn thing_routes() -> Router {
    Router::new()
        .route(
            "/thing",
            get(|| async {
                Json(Thing {
                    id: "1".into(),
                    name: Some("Thing1".into()),
                })
            })
            .post(|Json(thing): Json<Thing>| async move { Json(thing) }),
        )
        .route(
            "/thing/{thing_id}",
            get(|UrlPath(thing_id): UrlPath<String>| async move { Json(Thing::numbered(thing_id)) }),
        )
        .route(
            "/thing_query",
            get(|Query(query): Query<ThingId>| async move { Json(Thing::numbered(query.thing_id)) }),
        )
        .route(
            "/thing_header",
            get(|headers: HeaderMap| async move {
                let thing_id = headers
                    .get("thing_id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                Json(Thing::numbered(thing_id))
            }),
        )
        .route(
            "/thing_formdata",
            post(|Form(form): Form<ThingId>| async move {
                Json(Thing::numbered(form.thing_id))
            }),
        )
}
