//! mpv-based stream player
//!
//! One `mpv` child process per stream. Volume changes reach a running
//! stream through mpv's JSON IPC socket; the stored level is also passed on
//! the command line of the next stream.

use super::AudioBackend;
use crate::config::AudioConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Backend driving an external mpv process
#[derive(Debug)]
pub struct MpvBackend {
    binary: PathBuf,
    ipc_socket: PathBuf,
    start_grace: Duration,
    volume: u8,
    child: Option<Child>,
}

impl MpvBackend {
    /// Create the backend after checking that the mpv binary runs
    pub async fn probe(config: &AudioConfig) -> Result<Self> {
        let status = Command::new(&config.mpv_binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                Error::HardwareUnavailable(format!(
                    "cannot run {}: {}",
                    config.mpv_binary.display(),
                    e
                ))
            })?;

        if !status.success() {
            return Err(Error::HardwareUnavailable(format!(
                "{} --version exited with {}",
                config.mpv_binary.display(),
                status
            )));
        }

        Ok(Self {
            binary: config.mpv_binary.clone(),
            ipc_socket: config.ipc_socket.clone(),
            start_grace: config.start_grace(),
            volume: config.default_volume.min(100),
            child: None,
        })
    }

    async fn kill_child(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        child
            .kill()
            .await
            .map_err(|e| Error::Backend(format!("failed to stop mpv: {}", e)))?;

        if let Err(e) = tokio::fs::remove_file(&self.ipc_socket).await {
            debug!("IPC socket not removed: {}", e);
        }
        Ok(())
    }

    async fn send_command(&self, command: serde_json::Value) -> Result<()> {
        let mut stream = UnixStream::connect(&self.ipc_socket)
            .await
            .map_err(|e| Error::Backend(format!("mpv IPC connect failed: {}", e)))?;

        let mut line = command.to_string();
        line.push('\n');
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::Backend(format!("mpv IPC write failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl AudioBackend for MpvBackend {
    fn name(&self) -> &'static str {
        "mpv"
    }

    async fn start(&mut self, url: &str) -> Result<()> {
        if self.child.is_some() {
            self.kill_child().await?;
        }

        let mut child = Command::new(&self.binary)
            .arg("--no-video")
            .arg(format!("--volume={}", self.volume))
            .arg(format!("--input-ipc-server={}", self.ipc_socket.display()))
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Backend(format!("failed to spawn mpv: {}", e)))?;

        tokio::time::sleep(self.start_grace).await;

        match child.try_wait() {
            Ok(None) => {
                info!("mpv streaming {}", url);
                self.child = Some(child);
                Ok(())
            }
            Ok(Some(status)) => Err(Error::Backend(format!(
                "mpv exited during startup ({}) for {}",
                status, url
            ))),
            Err(e) => Err(Error::Backend(format!("cannot check mpv process: {}", e))),
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.kill_child().await
    }

    async fn set_volume(&mut self, level: u8) -> Result<()> {
        self.volume = level.min(100);

        if self.child.is_none() {
            return Ok(());
        }

        match self
            .send_command(json!({ "command": ["set_property", "volume", self.volume] }))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Volume change did not reach mpv: {}", e);
                Err(e)
            }
        }
    }

    fn is_active(&self) -> bool {
        self.child.is_some()
    }
}
