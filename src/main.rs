use clap::Parser;
use element_hunter::server::{routes, AppState, BrowserSettings};
use element_hunter::storage::{JsonFileStore, SnapshotStore};
use element_hunter::HunterConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 9669)]
    port: u16,

    /// Page to open on startup
    #[arg(short, long)]
    url: Option<String>,

    /// Chrome executable to launch
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<String>,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,

    /// Disable the Chrome sandbox (Linux AppArmor workaround)
    #[arg(long)]
    no_sandbox: bool,

    /// Attach to a Chrome already listening on this debug port
    #[arg(long)]
    debug_port: Option<u16>,

    /// JSON config file overriding naming tables and engine settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot file for the persisted session
    #[arg(long, env = "ELEMENT_HUNTER_STORE")]
    store: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    log::info!("Starting Element Hunter on port {}", args.port);

    let config = match &args.config {
        Some(path) => HunterConfig::from_file(path).await?,
        None => HunterConfig::default(),
    };

    let store_path = args
        .store
        .clone()
        .or_else(JsonFileStore::default_path)
        .unwrap_or_else(|| PathBuf::from("element-hunter-snapshot.json"));
    log::info!("💾 Session store: {}", store_path.display());
    let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(store_path));

    let state = Arc::new(AppState::new(
        config,
        store,
        BrowserSettings {
            chrome_path: args.chrome_path.clone(),
            headless: args.headless,
            no_sandbox: args.no_sandbox,
            debug_port: args.debug_port,
        },
    ));

    if let Some(url) = &args.url {
        match state.open_page(url).await {
            Ok(opened) => log::info!("Opened {} ({} elements restored)", opened.url, opened.elements),
            Err(e) => log::error!("Failed to open {}: {}", url, e),
        }
    }

    // Bind manually to handle "port in use" error gracefully
    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            log::info!("Listening on http://{}", addr);
            warp::serve(routes(state))
                .run_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
                .await;
            Ok(())
        }
        Err(e) => {
            log::error!("Failed to bind to port {}: {}", args.port, e);
            eprintln!("Error: Port {} is already in use or unavailable.", args.port);
            std::process::exit(1);
        }
    }
}
