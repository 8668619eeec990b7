use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use painted_playlists::media::MediaStore;
use painted_playlists::spotify::SpotifyService;
use painted_playlists::store::sqlite::SqliteStore;
use painted_playlists::web::session;
use painted_playlists::{cli, config, jobs, web, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "painted_playlists=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::CreateUser {
            username,
            email,
            password,
        }) => create_user(cfg, &username, &email, &password).await,
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
    let db = SqliteStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let spotify = SpotifyService::new(&cfg)?;
    let media = MediaStore::new(&cfg.media_root);

    let state = Arc::new(AppState {
        db: db.clone(),
        spotify,
        media,
        config: cfg,
    });

    let app = web::router(state);

    jobs::spawn_session_purge(db);
    tracing::info!("Background session purge started (hourly)");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("painted-playlists listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn create_user(
    cfg: config::Config,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    if password.len() < 8 {
        anyhow::bail!("password must be at least 8 characters");
    }

    let db = SqliteStore::connect(&cfg.database_url).await?;
    db.migrate().await?;

    if db.get_user_by_username(username).await?.is_some() {
        anyhow::bail!("a user named '{}' already exists", username);
    }

    let password_hash = session::hash_password(password)?;
    let user_id = db.create_user(username, email, &password_hash).await?;
    println!("Created user '{}' (id {})", username, user_id);
    Ok(())
}
