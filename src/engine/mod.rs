//! Execution engine: turns a script string into an [`ExecutionResult`].
//!
//! All classification lives here: success envelopes, script faults with
//! traceback, dispatcher timeouts, queue saturation. Transports never see
//! a raw runtime error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::runtime::{ScriptFault, ScriptOutput, ScriptRuntime};

/// Cap on each captured stream. Runaway scripts must not exhaust memory.
pub const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// Marker appended to a truncated capture buffer.
pub const TRUNCATION_MARKER: &str = "\n... [output truncated]";

/// Envelope in which every execute result travels, across all transports.
///
/// Exactly one of the success fields (`result`) or error fields
/// (`error_type`/`error_message`) is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub execution_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_traceback: Option<String>,
}

impl ExecutionResult {
    pub fn success(output: ScriptOutput, elapsed_ms: f64) -> Self {
        Self {
            success: true,
            result: output.value,
            stdout: truncate_capture(output.stdout),
            stderr: truncate_capture(output.stderr),
            execution_time_ms: elapsed_ms,
            error_type: None,
            error_message: None,
            error_traceback: None,
        }
    }

    pub fn fault(fault: ScriptFault, elapsed_ms: f64) -> Self {
        Self {
            success: false,
            result: None,
            stdout: truncate_capture(fault.stdout),
            stderr: truncate_capture(fault.stderr),
            execution_time_ms: elapsed_ms,
            error_type: Some(fault.error_type),
            error_message: Some(fault.message),
            error_traceback: fault.traceback,
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self {
            success: false,
            result: None,
            stdout: String::new(),
            stderr: String::new(),
            execution_time_ms: timeout_ms as f64,
            error_type: Some("TimeoutError".to_string()),
            error_message: Some(format!("Execution timed out after {timeout_ms}ms")),
            error_traceback: None,
        }
    }

    pub fn engine_error(error: &Error, elapsed_ms: f64) -> Self {
        Self {
            success: false,
            result: None,
            stdout: String::new(),
            stderr: String::new(),
            execution_time_ms: elapsed_ms,
            error_type: Some(error.kind().as_str().to_string()),
            error_message: Some(error.to_string()),
            error_traceback: None,
        }
    }
}

fn truncate_capture(mut s: String) -> String {
    if s.len() > MAX_CAPTURE_BYTES {
        // Truncate on a char boundary at or below the cap.
        let mut cut = MAX_CAPTURE_BYTES;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push_str(TRUNCATION_MARKER);
    }
    s
}

/// The engine: a runtime handle plus the dispatcher that serializes access
/// to it. Cheap to clone; all instances share the same funnel.
#[derive(Clone)]
pub struct ExecutionEngine {
    runtime: Arc<dyn ScriptRuntime>,
    dispatcher: Dispatcher,
    default_timeout: Duration,
}

impl ExecutionEngine {
    pub fn new(
        runtime: Arc<dyn ScriptRuntime>,
        dispatcher: Dispatcher,
        default_timeout: Duration,
    ) -> Self {
        Self {
            runtime,
            dispatcher,
            default_timeout,
        }
    }

    /// Execute a script on the UI thread, producing an envelope.
    ///
    /// Never returns `Err` for anything the script did; only the envelope
    /// reports script-level outcomes.
    pub async fn execute(&self, script: &str, timeout: Option<Duration>) -> ExecutionResult {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let start = Instant::now();

        let runtime = self.runtime.clone();
        let script = script.to_string();
        let outcome = self
            .dispatcher
            .submit(move || runtime.run(&script), timeout)
            .await;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(output)) => ExecutionResult::success(output, elapsed_ms),
            Ok(Err(fault)) => {
                debug!("Script raised {}: {}", fault.error_type, fault.message);
                ExecutionResult::fault(fault, elapsed_ms)
            }
            Err(Error::Timeout { timeout_ms }) => ExecutionResult::timeout(timeout_ms),
            Err(e) => ExecutionResult::engine_error(&e, elapsed_ms),
        }
    }

    /// Whether the GUI event loop is running in the FreeCAD process.
    pub fn ui_available(&self) -> bool {
        self.runtime.ui_available()
    }

    /// Default script timeout configured for this engine.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}
