use serde::{Deserialize, Serialize};
use std::env;
use std::{path::PathBuf, sync::Arc};

use reroute::data::context::{ExpansionConfig, ReferenceContext};
use reroute::data::expand::Expansion;
use reroute::data::reference::ReferenceTables;
use warp::Filter;

#[derive(Debug, Deserialize)]
struct ExpandRequest {
    /// Raw input: route lines, group headers, playbook directives or an advisory
    input: String,
}

#[derive(Debug, Serialize)]
struct ExpandResponse {
    input: String,
    #[serde(flatten)]
    expansion: Expansion,
}

struct AppState {
    context: ReferenceContext,
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || state.clone())
}

async fn expand_routes(payload: ExpandRequest, state: Arc<AppState>) -> Result<impl warp::Reply, warp::Rejection> {
    tracing::info!("Received input to expand: {} lines", payload.input.lines().count());
    let expansion = state.context.expand(&payload.input);

    Ok(warp::reply::with_status(
        warp::reply::json(&ExpandResponse {
            input: payload.input,
            expansion,
        }),
        warp::http::StatusCode::OK,
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let path = match args.get(1).cloned().or_else(|| env::var("REROUTE_DATA").ok()) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: {} <path_to_reference_tables> (or set REROUTE_DATA)", args[0]);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = match env::var("REROUTE_CONFIG") {
        Ok(config) => ExpansionConfig::from_json_file(&PathBuf::from(config))?,
        Err(_) => ExpansionConfig::default(),
    };

    // Build the reference context once at startup
    println!("Loading reference tables...");
    let tables = ReferenceTables::from_directory(&path)?;
    let context = ReferenceContext::build(tables, config);
    println!("Reference tables loaded successfully!");

    let state = Arc::new(AppState { context });

    // Configure CORS
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["Content-Type", "Authorization"]);

    let expand = warp::path("expand")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(expand_routes)
        .with(cors);

    println!("Server listening on http://127.0.0.1:3000");
    println!("POST to /expand with JSON: {{\"input\": \"KDFW >BOOVE3 J80 ABI< KLAX;#00FF00\"}}");

    warp::serve(expand).run(([127, 0, 0, 1], 3000)).await;

    Ok(())
}
