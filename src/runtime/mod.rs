//! The script runtime capability: what the bridge needs from FreeCAD.
//!
//! The CAD process implements [`ScriptRuntime`] around its embedded Python
//! interpreter and hands it to [`crate::server::BridgeServer`]. The trait is
//! deliberately small: run one script, report whether the GUI event loop is
//! pumping. Everything else (documents, objects, versions) is expressed as
//! scripts built on top of it.

use serde_json::Value;

/// Name of the mapping key a script assigns its output to.
pub const RESULT_SLOT: &str = "_result_";

/// Synthetic source name used when compiling scripts, so tracebacks are
/// recognizable as bridge-injected code.
pub const SCRIPT_SOURCE_NAME: &str = "<mcp>";

/// Output of a successfully executed script.
#[derive(Debug, Clone, Default)]
pub struct ScriptOutput {
    /// Value of the `_result_` slot after execution; `None` if unassigned.
    pub value: Option<Value>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// A script that raised: exception identity plus whatever was captured
/// before the failure.
#[derive(Debug, Clone)]
pub struct ScriptFault {
    /// Exception type name, e.g. `ValueError`.
    pub error_type: String,
    /// Exception message.
    pub message: String,
    /// Formatted traceback, if available. Contains [`SCRIPT_SOURCE_NAME`].
    pub traceback: Option<String>,
    /// Output captured up to the failure point.
    pub stdout: String,
    pub stderr: String,
}

/// Executes scripts inside the FreeCAD process.
///
/// Implementations bind `FreeCAD`, `App`, `FreeCADGui` and `Gui` into a
/// fresh mapping, compile the script with [`SCRIPT_SOURCE_NAME`], execute
/// it, and read back [`RESULT_SLOT`].
///
/// The runtime is single-threaded with respect to document mutation: when
/// the GUI is up, `run` must only be invoked from the UI thread. The
/// dispatcher enforces this; runtime implementations do not need their own
/// locking.
pub trait ScriptRuntime: Send + Sync {
    /// Execute a script, returning its result slot and captured streams.
    fn run(&self, script: &str) -> std::result::Result<ScriptOutput, ScriptFault>;

    /// True iff FreeCAD was started with its graphical shell and the event
    /// loop is running (`FreeCAD.GuiUp`). This is the only reliable GUI
    /// probe: the Qt libraries are resident in headless sessions too, but
    /// their event loop is not pumping.
    fn ui_available(&self) -> bool;
}
