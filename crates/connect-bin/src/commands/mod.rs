// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `run`: Start the adapter and stream events to stdout
//! - `schema`: Print the guessed event schema
//! - `options`: Print the selectable points
//! - `validate`: Validate the description file
//! - `describe`: Print the static adapter description
//! - `version`: Show version information

mod describe;
mod options;
mod run;
mod schema;
mod validate;
mod version;

pub use describe::describe;
pub use options::options;
pub use run::run;
pub use schema::schema;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Run(args) => run::run(&cli, args).await,
        Commands::Schema(args) => schema::schema(&cli, args).await,
        Commands::Options => options::options(&cli).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Describe => describe::describe(&cli),
        Commands::Version => version::version(&cli),
    }
}
