use ns_core::NarrativeError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> NarrativeError {
    NarrativeError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: NarrativeError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code());
    println!("ERROR_MSG_JSON:{}", json_string(&error.to_string()));
    1
}

pub(crate) fn json_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// Error steps carry the code of the engine error behind them; steps without
/// one are reported under `CLI_STEP`.
pub(crate) fn map_step_error(message: &str, code: Option<&str>) -> NarrativeError {
    match code {
        Some(code) => {
            let detail = message
                .strip_prefix(code)
                .and_then(|rest| rest.strip_prefix(": "))
                .unwrap_or(message);
            NarrativeError::new(code, detail)
        }
        None => NarrativeError::new("CLI_STEP", message),
    }
}

pub(crate) fn map_play_io(error: std::io::Error) -> NarrativeError {
    map_error("PLAY_IO", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> NarrativeError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_scan(error: std::path::StripPrefixError) -> NarrativeError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> NarrativeError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_state_write(error: std::io::Error) -> NarrativeError {
    map_error("CLI_STATE_WRITE", error)
}

pub(crate) fn map_cli_state_encode(error: serde_json::Error) -> NarrativeError {
    map_error("CLI_STATE_ENCODE", error)
}

pub(crate) fn map_cli_state_read(error: std::io::Error) -> NarrativeError {
    map_error("CLI_STATE_READ", error)
}

pub(crate) fn map_cli_state_invalid(error: serde_json::Error) -> NarrativeError {
    map_error("CLI_STATE_INVALID", error)
}
