use msafold::engine::config::ToolCommand;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid assignment '{0}'. Expected KEY=VALUE (e.g., 'prediction.workers=8').")]
    InvalidAssignment(String),

    #[error("Key cannot be empty in assignment '{0}'.")]
    EmptyKey(String),

    #[error("Invalid integer value for '{key}': '{value}'.")]
    InvalidInteger { key: String, value: String },

    #[error("Command for '{0}' cannot be empty.")]
    EmptyCommand(String),
}

/// Splits a `-S` override at its first `=`. Whitespace around the key and value is
/// ignored; the value may itself contain `=`.
pub fn parse_assignment(text: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| ParseError::InvalidAssignment(text.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ParseError::EmptyKey(text.to_string()));
    }
    Ok((key, value.trim()))
}

pub fn parse_count(key: &str, value: &str) -> Result<usize, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidInteger {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parses a tool command line such as `sh /opt/predictor/run.sh`.
pub fn parse_tool_command(key: &str, value: &str) -> Result<ToolCommand, ParseError> {
    ToolCommand::parse(value).ok_or_else(|| ParseError::EmptyCommand(key.to_string()))
}
