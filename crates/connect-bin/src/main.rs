// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! ua-connect: OPC UA subscription adapter.
//!
//! Main binary entry point.

use connect_bin::error::exit_with;
use connect_bin::{commands, context, init_logging, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let logging = context::logging_section(&cli);
    init_logging(
        cli.effective_log_level(logging.level.as_str()),
        cli.effective_log_format(logging.format),
    );

    if let Err(e) = commands::execute(cli).await {
        exit_with(e);
    }
}
