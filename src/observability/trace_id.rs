//! Trace/span id normalization for log correlation.
//!
//! Tracing backends render identifiers differently. W3C trace context uses
//! 128-bit hex trace ids and 64-bit hex span ids, while the log backend
//! correlates on a 64-bit unsigned decimal. Backends that already expose
//! decimal ids pass through unchanged.
//!
//! Normalization never fails: malformed input yields an empty string so the
//! access log line is still emitted, just without correlation.

use crate::config::TraceIdFormat;

/// Number of hex characters in a 64-bit id.
const HEX64_LEN: usize = 16;

/// Strategy converting native ids into correlation ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceIdNormalizer {
    /// Keep the low 64 bits of a hex id and render them in decimal.
    #[default]
    Hex128To64,
    /// Ids are already decimal; pass through.
    NativeDecimal,
}

impl TraceIdNormalizer {
    pub fn normalize(&self, raw: &str) -> String {
        match self {
            TraceIdNormalizer::Hex128To64 => hex_to_decimal(raw),
            TraceIdNormalizer::NativeDecimal => raw.to_string(),
        }
    }
}

impl From<TraceIdFormat> for TraceIdNormalizer {
    fn from(format: TraceIdFormat) -> Self {
        match format {
            TraceIdFormat::Hex128 => TraceIdNormalizer::Hex128To64,
            TraceIdFormat::Decimal => TraceIdNormalizer::NativeDecimal,
        }
    }
}

/// Fold a hex id to the decimal value of its last 16 hex characters.
///
/// Assumes the correlation bits live in the low 64 bits, which holds for W3C
/// trace ids. The encoding itself is not otherwise validated.
fn hex_to_decimal(raw: &str) -> String {
    if raw.len() < HEX64_LEN {
        return String::new();
    }
    // Not a char boundary means non-ASCII, which cannot be hex anyway.
    let Some(low) = raw.get(raw.len() - HEX64_LEN..) else {
        return String::new();
    };
    // from_str_radix tolerates a leading '+', hex digits do not.
    if !low.bytes().all(|b| b.is_ascii_hexdigit()) {
        return String::new();
    }
    match u64::from_str_radix(low, 16) {
        Ok(value) => value.to_string(),
        Err(_) => String::new(),
    }
}
