//! Machine-readable output for the CLI
//!
//! In JSON mode every command prints one object on stdout:
//! `{"ok": true, "command": ..., "data": ...}` or
//! `{"ok": false, "command": ..., "error": ...}`.

use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Human }
    }

    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

pub fn success_envelope(command: &str, data: Value) -> Value {
    json!({
        "ok": true,
        "command": command,
        "data": data,
    })
}

pub fn error_envelope(command: &str, message: &str) -> Value {
    json!({
        "ok": false,
        "command": command,
        "error": message,
    })
}

pub fn emit_success(mode: OutputMode, command: &str, data: Value) -> serde_json::Result<()> {
    if mode == OutputMode::Json {
        println!("{}", serde_json::to_string(&success_envelope(command, data))?);
    }
    Ok(())
}

pub fn emit_error(mode: OutputMode, command: &str, message: &str) -> serde_json::Result<()> {
    if mode == OutputMode::Json {
        println!("{}", serde_json::to_string(&error_envelope(command, message))?);
    }
    Ok(())
}
