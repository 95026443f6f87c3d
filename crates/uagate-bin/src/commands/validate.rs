// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::config::load_config;
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    if !config_path.exists() {
        return Err(BinError::Configuration(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let config = load_config(config_path)?;
    let warnings = config.warnings();

    match args.format {
        OutputFormat::Text => {
            println!("Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Servers: {}", config.servers.len());
            println!("  API: {}:{}", config.api.host, config.api.port);
            println!(
                "  Discovery timeout: {:?}",
                config.client.discovery_timeout
            );

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!(
                    "{}",
                    serde_yaml::to_string(&config)
                        .unwrap_or_else(|_| "(serialization error)".to_string())
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "server_count": config.servers.len(),
                    "api_host": config.api.host.to_string(),
                    "api_port": config.api.port,
                },
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output)
                    .unwrap_or_else(|_| "(serialization error)".to_string())
            );
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::Configuration(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}
