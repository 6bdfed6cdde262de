use crate::http::request::{Method, Request};
use crate::http::response::StatusCode;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty request")]
    Empty,
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
}

impl ParseError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BadRequest
    }
}

/// Parses a raw request head into a [`Request`].
///
/// The request line must split on single spaces into exactly three tokens.
/// Header lines are collected until the first line without a colon; that line
/// and anything after it are ignored.
pub fn parse_request_head(head: &str) -> Result<Request, ParseError> {
    let mut lines = head.lines();

    let request_line = match lines.next() {
        Some(line) if !line.is_empty() => line,
        _ => return Err(ParseError::Empty),
    };

    let parts: Vec<&str> = request_line.split(' ').collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine(request_line.to_string()));
    };

    if method.is_empty() || target.is_empty() || version.is_empty() {
        return Err(ParseError::MalformedRequestLine(request_line.to_string()));
    }

    let mut headers = HashMap::new();

    for line in lines {
        if line.is_empty() {
            break;
        }

        let Some((key, value)) = line.split_once(':') else {
            break;
        };

        headers.insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(Request {
        method: Method::parse(method),
        target: target.to_string(),
        version: version.to_string(),
        headers,
    })
}
