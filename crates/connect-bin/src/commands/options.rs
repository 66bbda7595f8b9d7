// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `options` command.

use connect_opcua::config::keys;

use crate::cli::Cli;
use crate::context::AppContext;
use crate::error::BinResult;

/// Prints the selectable points as a JSON array.
///
/// An incomplete description or an unreachable server prints `[]`.
pub async fn options(cli: &Cli) -> BinResult<()> {
    let context = AppContext::load(cli)?;
    let options = context
        .registry()
        .resolve_options(keys::AVAILABLE_NODES, &context.description())
        .await;
    println!("{}", serde_json::to_string_pretty(&options)?);
    Ok(())
}
