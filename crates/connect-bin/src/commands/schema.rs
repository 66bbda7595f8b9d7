// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `schema` command.

use connect_core::GuessSchema;

use crate::cli::{Cli, SchemaArgs};
use crate::context::AppContext;
use crate::error::BinResult;

/// Prints the guessed event schema as JSON.
pub async fn schema(cli: &Cli, args: SchemaArgs) -> BinResult<()> {
    let context = AppContext::load(cli)?;
    let guess = guess_schema(&context, args.preview).await?;
    println!("{}", serde_json::to_string_pretty(&guess)?);
    Ok(())
}

/// Guesses the schema, dropping the preview event unless asked for.
pub async fn guess_schema(context: &AppContext, preview: bool) -> BinResult<GuessSchema> {
    let adapter = context.create_adapter()?;
    let mut guess = adapter.get_schema().await?;
    if !preview {
        guess.preview.clear();
    }
    Ok(guess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::demo_file;

    #[tokio::test]
    async fn test_guess_schema_demo() {
        let context = AppContext::build(demo_file(), true).unwrap();

        let guess = guess_schema(&context, false).await.unwrap();
        assert!(!guess.event_schema.is_empty());
        assert!(guess.preview.is_empty());

        let guess = guess_schema(&context, true).await.unwrap();
        assert_eq!(guess.preview.len(), 1);
    }
}
