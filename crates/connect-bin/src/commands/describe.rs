// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `describe` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Prints the static adapter description as JSON. Needs no description file.
pub fn describe(_cli: &Cli) -> BinResult<()> {
    let model = connect_opcua::declare_model();
    println!("{}", serde_json::to_string_pretty(&model)?);
    Ok(())
}
