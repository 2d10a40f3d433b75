use log::{error, info, warn};
use std::io::Read;

use vds_adapter::{
    config::{AuthConfig, RunnerConfig, VdsConfig},
    result::ResultTable,
    VdsClient,
};

fn read_request(config: &RunnerConfig) -> Result<String, std::io::Error> {
    match &config.query_file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = VdsConfig::new().map_err(|e| {
        error!("Failed to initialize VDS config: {}", e);
        e
    })?;

    let auth = AuthConfig::new().map_err(|e| {
        error!("Failed to initialize auth config: {}", e);
        e
    })?;

    let runner = RunnerConfig::new().map_err(|e| {
        error!("Failed to initialize runner config: {}", e);
        e
    })?;

    let raw = read_request(&runner).map_err(|e| {
        error!("Failed to read query: {}", e);
        e
    })?;

    let request: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
        error!("Query is not valid JSON: {}", e);
        e
    })?;

    let client = VdsClient::http();
    let response = client
        .query_datasource_json(
            &auth.token,
            &config.datasource_luid,
            &config.domain,
            request,
            &config.call_options(),
        )
        .await
        .map_err(|e| {
            error!("VDS query failed: {}", e);
            e
        })?;

    match ResultTable::from_response(&response) {
        Some(table) => {
            info!("VDS returned {} rows", table.rows.len());
            print!("{}", table);
        }
        None => {
            warn!("Response has no tabular data, printing it as-is");
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
