//! Length-prefixed JSON framing over a child process's stdin/stdout: a
//! `u32` big-endian byte length followed by a UTF-8 JSON body. A zero-length
//! frame is the shutdown sentinel (see `SPEC_FULL.md` §9, "Global worker
//! pool").

use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use sandbox_runtime::CompiledUnit;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sheet_model::NodeId;

#[derive(Serialize, Deserialize)]
pub struct Request {
    pub unit: CompiledUnit,
    pub overrides: BTreeMap<NodeId, JsonValue>,
}

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    pub outcome: Option<sandbox_runtime::UnitOutcome>,
    pub error: Option<String>,
}

/// Returns `Ok(None)` on the shutdown sentinel (a zero-length frame) or on a
/// clean EOF (the pool closed the pipe without sending one).
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len == 0 {
        return Ok(None);
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    Ok(Some(body))
}

pub fn write_frame<W: Write>(writer: &mut W, body: &[u8]) -> io::Result<()> {
    writer.write_all(&(body.len() as u32).to_be_bytes())?;
    writer.write_all(body)?;
    writer.flush()
}

pub fn write_shutdown<W: Write>(writer: &mut W) -> io::Result<()> {
    writer.write_all(&0u32.to_be_bytes())?;
    writer.flush()
}
