// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Tokio Process Launcher
//!
//! Spawns hook commands as real OS processes. Output is discarded, never
//! captured or inherited, and a dropped handle kills its child.

use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use tokio::process::{Child, Command};

use crate::domain::execution::{CommandLine, LaunchedProcess, ProcessLauncher};

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessLauncher;

impl TokioProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for TokioProcessLauncher {
    fn launch(&self, command: &CommandLine) -> io::Result<Box<dyn LaunchedProcess>> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        Ok(Box::new(TokioProcess { child }))
    }
}

struct TokioProcess {
    child: Child,
}

#[async_trait]
impl LaunchedProcess for TokioProcess {
    async fn wait(&mut self) -> io::Result<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}
