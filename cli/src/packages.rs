//! One-shot package commands against the configured store.

use anyhow::{Context, Result};
use packtrack_core::bus::Bus;
use packtrack_core::config::AppConfig;
use packtrack_core::{PackageQuery, PackageStatus, PackageUpdate, SessionContext};
use packtrack_db::{PackageService, open_store};
use serde::Serialize;

async fn service(config: &AppConfig) -> Result<PackageService> {
    let store = open_store(config)
        .await
        .context("Failed to open the record store")?;
    Ok(PackageService::new(store))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{json}");
    Ok(())
}

pub fn build_update(
    status: &str,
    weight: Option<String>,
    packer: Option<String>,
    location: Option<String>,
) -> Result<PackageUpdate> {
    let update = PackageUpdate {
        status: PackageStatus::parse(status),
        weight,
        packer_name: packer,
        shipping_location: location,
    };
    update
        .normalized()
        .with_context(|| format!("Cannot move a package to {status:?}"))
}

pub async fn run_generate_command(config: &AppConfig, count: u32) -> Result<()> {
    let records = service(config).await?.generate(count).await?;
    for record in &records {
        println!("{}", record.code);
    }
    Ok(())
}

pub async fn run_show_command(config: &AppConfig, code: &str) -> Result<()> {
    let record = service(config).await?.get(code).await?;
    print_json(&record)
}

pub async fn run_advance_command(config: &AppConfig, code: &str, update: PackageUpdate) -> Result<()> {
    let mut bus = Bus::new();
    bus.insert(SessionContext {
        operator: Some("cli".to_string()),
        ..SessionContext::open()
    });
    let record = service(config)
        .await?
        .update_status(code, update, &mut bus)
        .await
        .with_context(|| format!("Could not update {code}"))?;
    print_json(&record)
}

pub async fn run_list_command(
    config: &AppConfig,
    status: Option<&str>,
    prefix: Option<String>,
    limit: Option<u32>,
) -> Result<()> {
    let query = PackageQuery {
        status: status.map(PackageStatus::parse),
        code_prefix: prefix,
        limit,
        ..PackageQuery::default()
    };
    let records = service(config).await?.list(&query).await?;
    print_json(&records)
}

pub async fn run_schematic_command(config: &AppConfig) -> Result<()> {
    let service = service(config).await?;
    print_json(service.schematic())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory() -> AppConfig {
        AppConfig {
            cache_url: "sqlite::memory:".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_build_update_parses_status() {
        let update = build_update("dispatched", None, None, Some("Dock 4".into())).unwrap();
        assert_eq!(update.status, PackageStatus::Dispatched);
        assert_eq!(update.shipping_location.as_deref(), Some("Dock 4"));
    }

    #[test]
    fn test_build_update_rejects_unknown_status() {
        assert!(build_update("DELIVERD", None, None, None).is_err());
        assert!(build_update("  ", None, None, None).is_err());
    }

    #[tokio::test]
    async fn test_commands_run_against_in_memory_store() {
        let config = in_memory();
        run_generate_command(&config, 2).await.unwrap();
        run_list_command(&config, Some("PENDING"), None, Some(5)).await.unwrap();
        run_schematic_command(&config).await.unwrap();
        assert!(run_show_command(&config, "20000101-0001").await.is_err());
    }
}
