use form_relay::{Relay, RelayConfig, RelayServer, TelegramClient};
use log::{error, info};
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // A missing .env is fine, the environment may already be set.
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Starting with {:?}", config);

    let api = TelegramClient::new(&config);
    let server = RelayServer::new(config.bind_addr, Relay::new(config, api));

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received");
                let _ = tx.send(true);
            }
            Err(e) => {
                error!("Failed to listen for Ctrl-C: {}", e);
                // Keep the sender alive so the server is not stopped.
                std::future::pending::<()>().await;
            }
        }
    });

    if let Err(e) = server.serve(rx).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}
