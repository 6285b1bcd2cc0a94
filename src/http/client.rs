use super::debug::HttpDebugConfig;
use crate::trace::{SessionTrace, TraceKind};
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// JSON-over-HTTP client shared by the LLM providers. With debugging on,
/// every exchange is described in redacted `[http-debug]` lines.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    debug: HttpDebugConfig,
    sink: LogSink,
}

#[derive(Clone)]
enum LogSink {
    Stderr,
    Trace(SessionTrace),
    #[cfg(test)]
    Buffer(Arc<Mutex<Vec<String>>>),
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("debug", &self.debug)
            .finish()
    }
}

impl HttpClient {
    pub fn new(inner: Client, debug: HttpDebugConfig) -> Self {
        Self {
            inner,
            debug,
            sink: LogSink::Stderr,
        }
    }

    /// Sends debug lines to the session trace instead of stderr, which the
    /// full-screen UI owns once it is running.
    pub fn with_trace(mut self, trace: SessionTrace) -> Self {
        self.sink = LogSink::Trace(trace);
        self
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer_token: Option<&str>,
        payload: &T,
    ) -> Result<HttpResponseData, reqwest::Error> {
        let mut builder = self.inner.post(url).json(payload);
        if let Some(token) = bearer_token {
            builder = builder.bearer_auth(token);
        }
        let request = builder.build()?;

        if self.debug.enabled {
            let body_json = serde_json::to_string(payload)
                .unwrap_or_else(|err| format!("{{\"_serialization_error\":\"{err}\"}}"));
            for line in request_log_lines(self.debug, &request, &body_json) {
                self.log_line(line);
            }
        }

        let response = match self.inner.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                if self.debug.enabled {
                    self.log_line(format!("[http-debug] ! {err}"));
                }
                return Err(err);
            }
        };
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if self.debug.enabled {
            for line in response_log_lines(self.debug, status, &headers, &body) {
                self.log_line(line);
            }
        }

        Ok(HttpResponseData { status, body })
    }

    fn log_line(&self, line: String) {
        match &self.sink {
            LogSink::Stderr => {
                let mut stderr = io::stderr().lock();
                let _ = writeln!(stderr, "{line}");
            }
            LogSink::Trace(trace) => trace.record(TraceKind::Http, &line),
            #[cfg(test)]
            LogSink::Buffer(buffer) => {
                if let Ok(mut b) = buffer.lock() {
                    b.push(line);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn with_buffer_sink(
        inner: Client,
        debug: HttpDebugConfig,
    ) -> (Self, Arc<Mutex<Vec<String>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let client = Self {
            inner,
            debug,
            sink: LogSink::Buffer(Arc::clone(&buffer)),
        };
        (client, buffer)
    }
}

fn request_log_lines(
    debug: HttpDebugConfig,
    request: &reqwest::Request,
    body_json: &str,
) -> Vec<String> {
    exchange_lines(
        debug,
        '>',
        format!("{} {}", request.method(), debug.url(request.url())),
        request.headers(),
        body_json,
    )
}

fn response_log_lines(
    debug: HttpDebugConfig,
    status: u16,
    headers: &HeaderMap,
    body: &str,
) -> Vec<String> {
    exchange_lines(debug, '<', format!("HTTP {status}"), headers, body)
}

fn exchange_lines(
    debug: HttpDebugConfig,
    direction: char,
    start_line: String,
    headers: &HeaderMap,
    body: &str,
) -> Vec<String> {
    let mut lines = vec![format!("[http-debug] {direction} {start_line}")];
    lines.extend(headers.iter().map(|(name, value)| {
        format!(
            "[http-debug] {direction} {}: {}",
            name.as_str(),
            debug.header_value(name.as_str(), value)
        )
    }));
    lines.push(format!("[http-debug] {direction}"));

    let body = debug.body(body);
    if body.is_empty() {
        lines.push(format!("[http-debug] {direction} <empty body>"));
    } else {
        lines.extend(body.lines().map(|line| format!("[http-debug] {direction} {line}")));
    }
    lines
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseData {
    pub status: u16,
    pub body: String,
}

impl HttpResponseData {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
