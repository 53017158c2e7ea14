//! XML-RPC server: the same method table over HTTP/1.1 POST.
//!
//! Engine-level failures on `execute` travel inside the result struct;
//! faults are reserved for protocol problems (bad XML, unknown method),
//! matching how script outcomes and wire outcomes stay distinct.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use tracing::debug;

use crate::error::Error;
use crate::server::methods::MethodTable;
use crate::wire::xmlrpc::{self, XmlValue};

const FAULT_PARSE: i32 = -32700;
const FAULT_METHOD_NOT_FOUND: i32 = -32601;
const FAULT_SERVER: i32 = -32500;

/// Build the XML-RPC router. Bound and served by [`crate::server`].
pub fn router(table: MethodTable) -> Router {
    Router::new()
        .route("/", post(handle))
        .route("/RPC2", post(handle))
        .with_state(table)
}

async fn handle(State(table): State<MethodTable>, body: Bytes) -> impl IntoResponse {
    let body = match std::str::from_utf8(&body) {
        Ok(s) => s,
        Err(_) => return xml_response(xmlrpc::write_fault(FAULT_PARSE, "body is not UTF-8")),
    };

    let call = match xmlrpc::parse_method_call(body) {
        Ok(call) => call,
        Err(e) => {
            debug!("Rejected XML-RPC request: {e}");
            return xml_response(xmlrpc::write_fault(FAULT_PARSE, &e.to_string()));
        }
    };

    let positional: Vec<serde_json::Value> = call.params.iter().map(XmlValue::to_json).collect();
    let params = MethodTable::positional_to_named(&call.name, &positional);

    match table.dispatch(&call.name, &params).await {
        Ok(result) => {
            xml_response(xmlrpc::write_method_response(&XmlValue::from_json(&result)))
        }
        Err(Error::Protocol(msg)) if msg.starts_with("Method not found") => {
            xml_response(xmlrpc::write_fault(FAULT_METHOD_NOT_FOUND, &msg))
        }
        Err(e) => {
            // Carry the kind on the first line so clients can lift it back out.
            let message = format!("{}: {}", e.kind(), e);
            xml_response(xmlrpc::write_fault(FAULT_SERVER, &message))
        }
    }
}

fn xml_response(body: String) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        body,
    )
}
