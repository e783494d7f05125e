//! depshift — migrate a device's enrollment from the legacy MDM to the
//! inventory/DEP service.
//!
//! Thin invocation boundary: parses `(operation, serial_number)`, wires the
//! clients and manager explicitly, and renders the result as JSON. Caller
//! authentication and HTTP-method mapping live in the front door, not here.

use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use depshift::application::{MigrationManager, OperationOutcome};
use depshift::domain::Operation;
use depshift::infra::{InventoryClient, LegacyMdmClient, RetryPolicy, RetryingClient, Settings};

/// Migrate a managed device between MDM backends
#[derive(Parser)]
#[command(name = "depshift", version)]
struct Cli {
    /// Operation to run: check, start, status, or finish
    operation: String,

    /// Device serial number
    serial_number: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(body) => println!("{body}"),
        Err((status, error)) => {
            eprintln!("{}", json!({ "error": error, "status": status }));
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<serde_json::Value, (u16, String)> {
    let op: Operation = cli.operation.parse().map_err(|e| (400, e))?;
    let settings = Settings::from_env().map_err(|e| (500, format!("{e:#}")))?;

    let http = RetryingClient::new(RetryPolicy::default()).map_err(|e| (500, e.to_string()))?;
    let mdm = LegacyMdmClient::new(
        http.clone(),
        settings.mdm_base_url.clone(),
        settings.mdm_client_id.clone(),
        settings.mdm_client_secret.clone(),
    );
    let inventory = InventoryClient::new(
        http,
        &settings.inventory_base_url,
        settings.inventory_token.clone(),
        settings.dep_profile_uuid.clone(),
    );
    let manager = MigrationManager::new(
        mdm,
        inventory,
        settings.taxonomy.clone(),
        settings.migration_tags(),
    );

    tracing::info!(operation = %op, serial = %cli.serial_number, "new request");
    let outcome = manager
        .execute(op, &cli.serial_number)
        .await
        .map_err(|e| (e.status_code(), e.to_string()))?;

    let mut body = json!({
        "operation": op.name(),
        "serial_number": cli.serial_number,
    });
    let result = match outcome {
        OperationOutcome::Check(check) => serde_json::to_value(check),
        OperationOutcome::Status(status) => serde_json::to_value(status),
        OperationOutcome::Done => Ok(json!({})),
    }
    .map_err(|e| (500, e.to_string()))?;
    if let (Some(body), Some(result)) = (body.as_object_mut(), result.as_object()) {
        for (key, value) in result {
            body.insert(key.clone(), value.clone());
        }
    }
    Ok(body)
}
