//! Structured access log records.
//!
//! One record per observed request, made of two groups: `http` (what the
//! request looked like and how it ended) and `dd` (service tags and
//! trace/span correlation ids). Records are handed to a [`LogSink`].

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::config::ServiceConfig;

/// The `http` group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpFields {
    pub status: u16,
    pub client: String,
    pub method: String,
    pub path: String,
    pub query: String,
    #[serde(rename = "user-agent")]
    pub user_agent: String,
    pub proto: String,
    /// Always present, empty when no client-identity header was sent.
    pub headers: BTreeMap<String, String>,
    /// Milliseconds.
    pub latency: f64,
    pub error: String,
}

/// The `dd` group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DdFields {
    pub service: String,
    pub version: String,
    pub env: String,
    pub trace_id: String,
    pub span_id: String,
}

/// A complete access log record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub http: HttpFields,
    pub dd: DdFields,
}

/// Destination for access log records.
pub trait LogSink: Send + Sync {
    /// Write one record at informational severity. Must not fail the request.
    fn emit(&self, record: &LogRecord);
}

/// Service, version and environment tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceTags {
    pub service: String,
    pub version: String,
    pub env: String,
}

/// Source of [`ServiceTags`], consulted for every record.
pub trait ServiceInfo: Send + Sync {
    fn tags(&self) -> ServiceTags;
}

/// Reads the tags from environment variables at call time.
///
/// Unset or non-UTF-8 variables become empty strings.
#[derive(Debug, Clone)]
pub struct EnvServiceInfo {
    service_var: String,
    version_var: String,
    env_var: String,
}

impl EnvServiceInfo {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            service_var: config.service_env.clone(),
            version_var: config.version_env.clone(),
            env_var: config.env_env.clone(),
        }
    }
}

impl Default for EnvServiceInfo {
    fn default() -> Self {
        Self::new(&ServiceConfig::default())
    }
}

impl ServiceInfo for EnvServiceInfo {
    fn tags(&self) -> ServiceTags {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        ServiceTags {
            service: var(&self.service_var),
            version: var(&self.version_var),
            env: var(&self.env_var),
        }
    }
}

/// Fixed tags, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticServiceInfo(pub ServiceTags);

impl ServiceInfo for StaticServiceInfo {
    fn tags(&self) -> ServiceTags {
        self.0.clone()
    }
}

/// Envelope written by [`JsonLineSink`].
#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    severity: &'static str,
    msg: &'static str,
    http: &'a HttpFields,
    dd: &'a DdFields,
}

/// Writes each record as a single JSON line.
pub struct JsonLineSink<W> {
    writer: Mutex<W>,
}

impl JsonLineSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_record(&self, record: &LogRecord) -> io::Result<()> {
        let line = JsonLine {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            severity: "info",
            msg: "",
            http: &record.http,
            dd: &record.dd,
        };
        let mut buf = serde_json::to_vec(&line)?;
        buf.push(b'\n');

        // A panic elsewhere while holding the lock leaves the writer usable.
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.write_all(&buf)?;
        writer.flush()
    }
}

impl<W: Write + Send> LogSink for JsonLineSink<W> {
    fn emit(&self, record: &LogRecord) {
        if let Err(e) = self.write_record(record) {
            tracing::warn!(
                error = %e,
                path = %record.http.path,
                "Failed to write access log record"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record() -> LogRecord {
        LogRecord {
            http: HttpFields {
                status: 200,
                client: "127.0.0.1".into(),
                method: "GET".into(),
                path: "/ping".into(),
                query: "temp=21.5".into(),
                user_agent: "curl/8.0".into(),
                proto: "HTTP/1.1".into(),
                headers: BTreeMap::new(),
                latency: 12.3,
                error: String::new(),
            },
            dd: DdFields {
                service: "svc".into(),
                version: "1.0".into(),
                env: "prod".into(),
                trace_id: "1".into(),
                span_id: "2".into(),
            },
        }
    }

    #[test]
    fn test_record_shape() {
        let value = serde_json::to_value(record()).unwrap();
        assert_eq!(
            value,
            json!({
                "http": {
                    "status": 200,
                    "client": "127.0.0.1",
                    "method": "GET",
                    "path": "/ping",
                    "query": "temp=21.5",
                    "user-agent": "curl/8.0",
                    "proto": "HTTP/1.1",
                    "headers": {},
                    "latency": 12.3,
                    "error": ""
                },
                "dd": {
                    "service": "svc",
                    "version": "1.0",
                    "env": "prod",
                    "trace_id": "1",
                    "span_id": "2"
                }
            })
        );
    }

    #[test]
    fn test_json_line_sink_writes_one_line_per_record() {
        let sink = JsonLineSink::new(Vec::new());
        sink.emit(&record());
        sink.emit(&record());

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let line: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(line["severity"], "info");
        assert_eq!(line["msg"], "");
        assert_eq!(line["http"]["status"], 200);
        assert_eq!(line["dd"]["trace_id"], "1");
        assert!(line["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_json_line_keeps_groups_nested() {
        let mut record = record();
        record
            .http
            .headers
            .insert("x-real-ip".into(), "9.9.9.9".into());

        let sink = JsonLineSink::new(Vec::new());
        sink.emit(&record);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let line: Value = serde_json::from_str(output.trim_end()).unwrap();
        let mut keys: Vec<&str> = line
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, ["dd", "http", "msg", "severity", "timestamp"]);

        let http = &line["http"];
        assert!(http.is_object(), "http group is {http:?}");
        assert!(http["status"].is_u64());
        assert!(http["latency"].is_f64());
        assert_eq!(http["headers"], json!({ "x-real-ip": "9.9.9.9" }));
        assert!(line["dd"].is_object(), "dd group is {:?}", line["dd"]);
        assert_eq!(line["dd"]["span_id"], "2");
    }

    #[test]
    fn test_env_service_info_reads_at_call_time() {
        let config = ServiceConfig {
            service_env: "REQUEST_OBSERVER_TEST_SERVICE".into(),
            version_env: "REQUEST_OBSERVER_TEST_VERSION".into(),
            env_env: "REQUEST_OBSERVER_TEST_ENV_UNSET".into(),
        };
        let info = EnvServiceInfo::new(&config);

        std::env::set_var("REQUEST_OBSERVER_TEST_SERVICE", "checkout");
        std::env::set_var("REQUEST_OBSERVER_TEST_VERSION", "1.2.3");
        let tags = info.tags();
        assert_eq!(tags.service, "checkout");
        assert_eq!(tags.version, "1.2.3");
        assert_eq!(tags.env, "");

        std::env::set_var("REQUEST_OBSERVER_TEST_VERSION", "1.2.4");
        assert_eq!(info.tags().version, "1.2.4");

        std::env::remove_var("REQUEST_OBSERVER_TEST_SERVICE");
        std::env::remove_var("REQUEST_OBSERVER_TEST_VERSION");
        assert_eq!(info.tags(), ServiceTags::default());
    }
}
