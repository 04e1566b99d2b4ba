//! Health check command - checks a running Vaultkeeper server.

use std::time::Duration;

use vaultkeeper::rpc::client::VaultClient;

use crate::cli::HealthArgs;

/// Run the health check command
pub async fn run(args: &HealthArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = VaultClient::new(args.server.as_str());
    let probe = tokio::time::timeout(Duration::from_secs(args.timeout), client.health());

    match probe.await {
        Ok(Ok(health)) if health.status == "ok" => {
            println!("healthy: {}", client.base_url());
            Ok(())
        }
        Ok(Ok(health)) => {
            eprintln!("unhealthy: server returned status {}", health.status);
            std::process::exit(1);
        }
        Ok(Err(status)) => {
            eprintln!("unhealthy: {} ({})", status.message(), status.code());
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!(
                "unhealthy: no answer from {} within {}s",
                client.base_url(),
                args.timeout
            );
            std::process::exit(1);
        }
    }
}
