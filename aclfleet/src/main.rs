mod cli;

use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{error, warn};
use tokio_util::sync::CancellationToken;

use aclfleet::transport::SshSessionClient;
use aclfleet::{ConfigLoader, FleetRunner};

use cli::{Cli, EXIT_CONFIG};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level().as_str()))
        .format_timestamp_millis()
        .init();

    let config = match ConfigLoader::load(&cli.config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("aclfleet: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let directive = cli.directive();

    let tls = cli.tls_material(&config);
    let client = SshSessionClient::default()
        .port(cli.port)
        .timeout(cli.step_timeout());

    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling remaining sessions");
            handle.cancel();
        }
    });

    let outcome = FleetRunner::new(&client, &tls, cli.run_options(token.clone()))
        .run(&config, &directive)
        .await;

    if cli.json {
        match serde_json::to_string_pretty(&outcome) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("failed to encode outcome: {}", e),
        }
    } else {
        println!("{}", cli::summary(&outcome));
    }

    ExitCode::from(cli::exit_status(&outcome))
}
