// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use connect_config::{ConfigLoader, DescriptionFile};

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Validates the description file without connecting to the server.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;
    let file = ConfigLoader::new()
        .load_validated(config_path)
        .map_err(|e| BinError::from(e).context(format!("Validation failed for {}", config_path.display())))?;

    let warnings = collect_warnings(&file);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Description is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Endpoint: {}", endpoint(&file));
            println!("  Auth: {}", if file.adapter.auth.is_some() { "username" } else { "anonymous" });
            println!(
                "  Root: ns={};s={}",
                file.adapter.namespace_index.unwrap_or_default(),
                file.adapter.node_id.as_deref().unwrap_or_default()
            );
            println!("  Selected points: {}", file.adapter.selected_nodes.len());

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Adapter description:");
                println!("{}", serde_json::to_string_pretty(&file.into_description())?);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "endpoint": endpoint(&file),
                    "authenticated": file.adapter.auth.is_some(),
                    "namespace_index": file.adapter.namespace_index,
                    "node_id": file.adapter.node_id,
                    "selected_points": file.adapter.selected_nodes.len(),
                },
                "warnings": warnings,
                "description": if args.show_config { Some(file.into_description()) } else { None },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn endpoint(file: &DescriptionFile) -> String {
    let server = &file.adapter.server;
    match (&server.url, &server.host, server.port) {
        (Some(url), _, _) => url.clone(),
        (None, Some(host), Some(port)) => format!("opc.tcp://{}:{}", host, port),
        _ => String::from("(unset)"),
    }
}

fn collect_warnings(file: &DescriptionFile) -> Vec<String> {
    let mut warnings = Vec::new();
    if file.adapter.selected_nodes.is_empty() {
        warnings.push("No points selected; every variable below the root will be subscribed".to_string());
    }
    if file.adapter.auth.is_none() {
        warnings.push("Anonymous access".to_string());
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::demo_file;

    #[test]
    fn test_endpoint() {
        let mut file = demo_file();
        assert_eq!(endpoint(&file), "opc.tcp://localhost:4840");

        file.adapter.server.url = None;
        file.adapter.server.host = Some("plc".into());
        file.adapter.server.port = Some(4841);
        assert_eq!(endpoint(&file), "opc.tcp://plc:4841");
    }

    #[test]
    fn test_warnings() {
        let mut file = demo_file();
        assert_eq!(collect_warnings(&file).len(), 2);

        file.adapter.selected_nodes = vec!["Plant.Line1.Speed".into()];
        assert_eq!(collect_warnings(&file), vec!["Anonymous access".to_string()]);
    }
}
