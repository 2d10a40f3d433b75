use log::{error, info};

use vds_adapter::{
    config::{AuthConfig, VdsConfig},
    query::{FieldRef, Query, SortDirection},
    result::{metadata_fields, ResultTable},
    VdsClient,
};

const MAX_LISTED_FIELDS: usize = 25;

/// Region summary that is known to work against the Superstore sample data
fn sample_query() -> Query {
    Query::new(vec![
        FieldRef {
            sort_priority: Some(1),
            ..FieldRef::dimension("Region")
        },
        FieldRef::measure("Discount", "AVG"),
        FieldRef::measure("Sales", "SUM"),
        FieldRef::measure("Profit", "SUM").sorted(2, SortDirection::Desc),
    ])
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

    let options = config.call_options();
    let client = VdsClient::http();

    let metadata = client
        .read_metadata(&auth.token, &config.datasource_luid, &config.domain, &options)
        .await
        .map_err(|e| {
            error!("VDS read-metadata failed: {}", e);
            e
        })?;

    let fields = metadata_fields(&metadata);
    info!("read-metadata returned {} fields", fields.len());
    println!("Total fields: {}", fields.len());
    for field in fields.iter().take(MAX_LISTED_FIELDS) {
        println!(
            "- {} | {}",
            field.caption,
            field.data_type.as_deref().unwrap_or("UNKNOWN")
        );
    }

    let response = client
        .query_datasource(
            &auth.token,
            &config.datasource_luid,
            &config.domain,
            sample_query(),
            &options,
        )
        .await
        .map_err(|e| {
            error!("VDS query-datasource failed: {}", e);
            e
        })?;

    match ResultTable::from_response(&response) {
        Some(table) => print!("{}", table),
        None => println!("{}", serde_json::to_string_pretty(&response)?),
    }

    Ok(())
}
