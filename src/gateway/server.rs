//! HTTP binding over `tiny_http`.
//!
//! Requests are accepted on the listener thread and handled on a rayon pool.
//! Each transport request is converted into a dispatcher [`Request`] with a
//! bounded body, and the dispatcher [`Response`] is written back.

use crate::core::time::new_request_id;
use crate::gateway::dispatch::{self, Dispatcher, HEADER_REQUEST_ID, Request, Response, error_response};
use anyhow::{Result, anyhow};
use std::sync::Arc;
use tiny_http::{Header, Server, StatusCode};

/// A bound listener ready to serve.
pub struct GatewayServer {
    server: Server,
    dispatcher: Arc<Dispatcher>,
    workers: usize,
}

impl GatewayServer {
    pub fn bind(addr: &str, dispatcher: Arc<Dispatcher>, workers: usize) -> Result<Self> {
        let server = Server::http(addr).map_err(|e| anyhow!("Failed to bind {addr}: {e}"))?;
        Ok(Self {
            server,
            dispatcher,
            workers: workers.max(1),
        })
    }

    pub fn addr(&self) -> String {
        self.server.server_addr().to_string()
    }

    /// Serve until the listener shuts down.
    pub fn run(self) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("formgate-worker-{i}"))
            .build()?;
        tracing::info!(addr = %self.addr(), workers = self.workers, "listening");

        for request in self.server.incoming_requests() {
            let dispatcher = Arc::clone(&self.dispatcher);
            pool.spawn(move || {
                if let Err(e) = handle_request(request, &dispatcher) {
                    tracing::warn!(error = %e, "failed to send response");
                }
            });
        }
        Ok(())
    }
}

fn handle_request(mut request: tiny_http::Request, dispatcher: &Dispatcher) -> Result<()> {
    let method = request.method().to_string();
    let url = request.url().to_string();
    let content_type = header_value(&request, "Content-Type");
    let declared_len = request.body_length();

    let response = match dispatch::read_body(
        request.as_reader(),
        declared_len,
        dispatcher.max_body_bytes(),
    ) {
        Ok(body) => {
            let mut req = Request::new(method.as_str(), &url).with_body(body);
            req.content_type = content_type;
            dispatcher.dispatch(&req)
        }
        Err(err) => {
            let request_id = new_request_id();
            tracing::info!(id = %request_id, method = %method, url = %url, status = err.status(), "body rejected");
            error_response(&err, &request_id).with_header(HEADER_REQUEST_ID, request_id.clone())
        }
    };

    request.respond(transport_or_fault(response))?;
    Ok(())
}

type TransportResponse = tiny_http::Response<std::io::Cursor<Vec<u8>>>;

/// Convert `response`, or fall back to a bare 500 when a header cannot be encoded.
fn transport_or_fault(response: Response) -> TransportResponse {
    let status = response.status;
    to_transport(response).unwrap_or_else(|e| {
        tracing::error!(status, error = %e, "unencodable response; sending 500");
        tiny_http::Response::from_data(b"internal server error".to_vec())
            .with_status_code(StatusCode(500))
    })
}

fn header_value(request: &tiny_http::Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.to_string())
}

fn make_header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|_| anyhow!("invalid header {name}: {value:?}"))
}

fn to_transport(response: Response) -> Result<TransportResponse> {
    let mut out = tiny_http::Response::from_data(response.body)
        .with_status_code(StatusCode(response.status));
    if let Some(content_type) = &response.content_type {
        out.add_header(make_header("Content-Type", content_type)?);
    }
    for (name, value) in &response.headers {
        out.add_header(make_header(name, value)?);
    }
    Ok(out)
}
