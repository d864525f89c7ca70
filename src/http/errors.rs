//! Private handler errors.
//!
//! Handlers report internal problems that should reach the access log but not
//! the client by attaching [`PrivateErrors`] to the response extensions.

use std::fmt;

use axum::response::Response;

/// Errors a handler flagged as internal to the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivateErrors(Vec<String>);

impl PrivateErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: impl fmt::Display) {
        self.0.push(error.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Numbered, one per line: `Error #01: <msg>\n`.
impl fmt::Display for PrivateErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            writeln!(f, "Error #{:02}: {}", i + 1, error)?;
        }
        Ok(())
    }
}

/// Record a private error on a response, appending to any already present.
pub fn record_private_error(response: &mut Response, error: impl fmt::Display) {
    let extensions = response.extensions_mut();
    match extensions.get_mut::<PrivateErrors>() {
        Some(errors) => errors.push(error),
        None => {
            let mut errors = PrivateErrors::new();
            errors.push(error);
            extensions.insert(errors);
        }
    }
}

/// Rendered private errors of a response, empty if there are none.
pub fn private_error_message(response: &Response) -> String {
    response
        .extensions()
        .get::<PrivateErrors>()
        .map(ToString::to_string)
        .unwrap_or_default()
}
