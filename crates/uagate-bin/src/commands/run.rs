// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use tracing::info;

use crate::cli::{Cli, RunArgs};
use crate::error::BinResult;
use crate::runtime::RuntimeBuilder;

/// Executes the `run` command to start the gateway.
///
/// The builder carries no transport factory here; the packaged binary
/// expects the embedding deployment to register its protocol stack
/// adapter. Without one, `build` reports a configuration error instead
/// of starting a gateway that cannot reach any server.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    info!("Starting uagate gateway...");

    let runtime = RuntimeBuilder::new()
        .config_path(&cli.config)
        .port(args.port)
        .build()?;

    runtime.run().await
}
