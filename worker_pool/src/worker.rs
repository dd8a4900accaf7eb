use std::process::Stdio;

use sandbox_runtime::{CompiledUnit, UnitOutcome};
use serde_json::Value as JsonValue;
use sheet_model::NodeId;
use std::collections::BTreeMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::config::Config;
use crate::error::PoolError;
use worker_process::protocol::{Request, Response};

/// One persistent child process and the pipes to talk to it. Unlike the
/// bounded command runner this pool's concurrency gating is modeled on,
/// a worker here is never torn down after a single unit of work: it is
/// reused across requests until it times out or the pipe breaks, then
/// respawned (see `SPEC_FULL.md` §9, grounded on the nailgun child-process
/// lifecycle).
pub struct WorkerSlot {
    config: Config,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
}

impl WorkerSlot {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            child: None,
            stdin: None,
            stdout: None,
        }
    }

    fn is_alive(&self) -> bool {
        self.child.is_some()
    }

    async fn spawn(&mut self) -> Result<(), PoolError> {
        let mut child = Command::new(&self.config.worker_binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PoolError::Spawn(e.to_string()))?;

        let stdin = child.stdin.take().ok_or_else(|| PoolError::Spawn("no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PoolError::Spawn("no stdout".into()))?;

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stdout = Some(BufReader::new(stdout));
        Ok(())
    }

    async fn ensure_alive(&mut self) -> Result<(), PoolError> {
        if !self.is_alive() {
            self.spawn().await?;
        }
        Ok(())
    }

    /// Kills the underlying process and marks this slot dead. The next call
    /// to `execute` lazily respawns it: there is no separate background
    /// supervisor task.
    fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
        }
        self.stdin = None;
        self.stdout = None;
    }

    pub async fn execute(
        &mut self,
        unit: &CompiledUnit,
        overrides: &BTreeMap<NodeId, JsonValue>,
        timeout: std::time::Duration,
    ) -> Result<UnitOutcome, PoolError> {
        self.ensure_alive().await?;

        let request = Request {
            unit: unit.clone(),
            overrides: overrides.clone(),
        };
        let body = serde_json::to_vec(&request).map_err(|e| PoolError::Protocol(e.to_string()))?;

        let outcome = tokio::time::timeout(timeout, self.roundtrip(&body)).await;

        match outcome {
            Ok(Ok(response)) => {
                if response.ok {
                    response.outcome.ok_or_else(|| PoolError::Protocol("missing outcome".into()))
                } else {
                    Err(PoolError::Worker(response.error.unwrap_or_default()))
                }
            }
            Ok(Err(e)) => {
                self.kill();
                Err(e)
            }
            Err(_) => {
                self.kill();
                Err(PoolError::Timeout)
            }
        }
    }

    async fn roundtrip(&mut self, body: &[u8]) -> Result<Response, PoolError> {
        let stdin = self.stdin.as_mut().expect("ensure_alive just set this");
        write_frame(stdin, body).await.map_err(|e| PoolError::Io(e.to_string()))?;

        let stdout = self.stdout.as_mut().expect("ensure_alive just set this");
        let frame = read_frame(stdout)
            .await
            .map_err(|e| PoolError::Io(e.to_string()))?
            .ok_or_else(|| PoolError::Io("worker closed its stdout".into()))?;

        serde_json::from_slice(&frame).map_err(|e| PoolError::Protocol(e.to_string()))
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.kill();
    }
}

async fn write_frame(writer: &mut ChildStdin, body: &[u8]) -> std::io::Result<()> {
    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await
}

async fn read_frame(reader: &mut BufReader<ChildStdout>) -> std::io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_bytes).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Ok(None);
        }
        return Err(e);
    }
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len == 0 {
        return Ok(None);
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}
