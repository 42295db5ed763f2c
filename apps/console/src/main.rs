//! Capacita operator console.

#![forbid(unsafe_code)]

mod commands;
mod console_config;

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use capacita_application::{AuthorizationService, SessionOrchestrator};
use capacita_core::AppError;
use capacita_infrastructure::{CredentialStore, HttpTrainingBackend};
use tracing::{error, info};

use crate::commands::{Command, Console, describe_failure};
use crate::console_config::{ConsoleConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<ExitCode, AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(AppError::Validation(message)) => {
            eprintln!("{message}");
            return Ok(ExitCode::from(2));
        }
        Err(error) => return Err(error),
    };
    let config = ConsoleConfig::load()?;

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let backend = Arc::new(HttpTrainingBackend::new(
        http_client,
        config.api_base_url.as_str(),
        CredentialStore::with_token(config.api_token.as_str()),
        config.grade_scale,
    ));
    info!(api_base_url = %config.api_base_url, "capacita console ready");

    let console = Console {
        authorization: AuthorizationService::new(backend.clone()),
        orchestrator: SessionOrchestrator::new(backend),
    };

    match console.run(command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(failure) => {
            error!(kind = failure.kind().as_str(), "command failed");
            eprintln!("{}", describe_failure(&failure));
            Ok(ExitCode::FAILURE)
        }
    }
}
