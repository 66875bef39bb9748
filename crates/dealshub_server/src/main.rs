use std::process::ExitCode;

use dealshub_core::auth::SessionSigner;
use dealshub_core::open_db;
use dealshub_server::config::ServerConfig;
use dealshub_server::state::{AppState, Integrations};
use dealshub_server::{EXPIRY_INTERVAL, serve, shutdown_signal, spawn_expiry_task};
use log::{error, info};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("dealshub_server: invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = dealshub_core::init_logging(&config.log_level, config.log_dir.as_deref()) {
        eprintln!("dealshub_server: logging init failed: {err}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=server_exit module=main status=error error={message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), String> {
    info!(
        "event=server_boot module=main status=start core_version={} config={config:?}",
        dealshub_core::core_version()
    );
    let conn = open_db(&config.db_path).map_err(|err| format!("open database: {err}"))?;
    let signer = SessionSigner::new(config.session_secret.as_bytes().to_vec())
        .map_err(|err| format!("session signer: {err}"))?;
    let integrations =
        Integrations::from_config(&config).map_err(|err| format!("integrations: {err}"))?;

    let address = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(config, signer, conn, integrations);
    let expiry = spawn_expiry_task(state.clone(), EXPIRY_INTERVAL);

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|err| format!("bind {address}: {err}"))?;
    let result = serve(listener, state, shutdown_signal())
        .await
        .map_err(|err| format!("serve: {err}"));
    expiry.abort();
    result
}
