use anyhow::Result;
use secrecy::ExposeSecret;
use std::sync::Arc;

use seedapi::cli::{Cli, Commands};
use seedapi::{run_server, AppState};
use seedcore::auth::{sign_init_data, InitDataVerifier};
use seedcore::logging::{configuration_summary, init_logger, log_configuration};
use seedcore::Config;

/// Entry point for the SeedNote API
///
/// Parses CLI arguments, loads configuration and dispatches to the subcommand.
///
/// # Errors
/// Returns an error if configuration is invalid or the server cannot start.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Sign {
            user_id,
            auth_date,
            fields,
        } => {
            let auth_date = auth_date.unwrap_or_else(|| chrono::Utc::now().timestamp());
            let mut all_fields = vec![
                ("auth_date".to_string(), auth_date.to_string()),
                ("user".to_string(), serde_json::json!({ "id": user_id }).to_string()),
            ];
            all_fields.extend(fields);

            println!("{}", sign_init_data(all_fields, config.bot_token.expose_secret()));
            Ok(())
        }
        Commands::Verify { init_data } => {
            let verifier =
                InitDataVerifier::new(config.bot_token.expose_secret()).with_max_age(config.init_data_max_age);
            let principal = verifier
                .verify(&init_data)
                .map_err(|e| anyhow::anyhow!("Verification failed: {}", e))?;

            println!("{}", principal.id());
            Ok(())
        }
        Commands::CheckConfig => {
            for line in configuration_summary(&config) {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

async fn serve(mut config: Config, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.bind_addr.set_port(port);
    }

    init_logger(config.log_file_path.as_deref())?;
    log_configuration(&config);

    let state = AppState::from_config(&config)?;
    run_server(config.bind_addr, Arc::new(state)).await
}
