//! Claimwatch Dashboard Core - Entry Point
//!
//! Runs the session controller against the configured backend: restores a
//! persisted session (or logs in with the configured credentials), prints
//! the role's navigation and home section, then keeps the metrics poller
//! running until ctrl-c.

use claimwatch::{
    Authenticator, Config, ContentLoader, DashboardController, FileStore, HttpBackend,
    NavigationResolver, SessionStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("Claimwatch Dashboard Core v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: claimwatch [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --help, -h         Show this help");
        println!();
        println!("Environment variables:");
        println!("  CLAIMWATCH_API_ORIGIN          Backend origin (default: http://127.0.0.1:3000)");
        println!("  CLAIMWATCH_SESSION_PATH        Session file location");
        println!("  CLAIMWATCH_POLL_INTERVAL_SECS  Metrics refresh cadence (default: 30)");
        println!("  CLAIMWATCH_LOGIN_TIMEOUT_SECS  Remote login timeout (default: 5)");
        println!("  CLAIMWATCH_USERNAME            Login username (default: analyst)");
        println!("  CLAIMWATCH_PASSWORD            Login password (default: password)");
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Claimwatch Dashboard Core v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let backend = Arc::new(HttpBackend::new(&config.api_origin));

    let mut controller = DashboardController::new(
        SessionStore::new(Box::new(FileStore::open(config.session_path.clone())?)),
        Authenticator::with_timeout(&config.api_origin, config.login_timeout),
        NavigationResolver::with_defaults(),
        ContentLoader::with_defaults(),
        backend,
        config.poll_interval,
    );

    let report = match controller.restore_session()? {
        Some(report) => report,
        None => {
            let username =
                std::env::var("CLAIMWATCH_USERNAME").unwrap_or_else(|_| "analyst".to_string());
            let password =
                std::env::var("CLAIMWATCH_PASSWORD").unwrap_or_else(|_| "password".to_string());

            let report = controller.login(&username, &password).await?;
            if report.used_fallback {
                warn!("Backend unreachable - running against the demo account table");
            }
            report
        }
    };

    println!("Navigation:");
    for entry in &report.navigation {
        println!("  [{}] {}", entry.id, entry.label);
    }
    println!();
    println!("== {} ==", report.home.title);
    println!("{}", report.home.body);

    info!("Polling metrics every {}s - ctrl-c to log out", config.poll_interval.as_secs());

    let mut check = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            _ = check.tick() => {
                if controller.check_forced_logout().await {
                    warn!("Session rejected by the backend");
                    return Ok(());
                }
            }
        }
    }

    controller.logout().await;
    Ok(())
}
