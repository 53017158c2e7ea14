//! Script construction helpers.
//!
//! Tool templates never interpolate caller-supplied values directly into
//! Python source. [`py_literal`] renders any JSON value as a Python literal
//! so the interpreter sees exactly the value the caller sent, even for
//! strings like `foo'); bar()`.

use serde_json::Value;

/// Render a JSON value as a Python literal expression.
///
/// Mapping: null → `None`, booleans → `True`/`False`, numbers unchanged,
/// strings → quoted with full escaping, arrays → lists, objects → dicts.
pub fn py_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => py_str(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(py_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", py_str(k), py_literal(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Render a string as a double-quoted Python string literal.
///
/// Escapes backslashes, quotes, and control characters; everything else
/// passes through untouched (Python source is UTF-8).
pub fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\x00"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Optional string as a Python literal: `None` when absent.
pub fn py_opt_str(s: Option<&str>) -> String {
    match s {
        Some(s) => py_str(s),
        None => "None".to_string(),
    }
}

/// Preamble that resolves a document by name, falling back to the active
/// document, and assigns a controlled error to `_result_` on failure.
///
/// Scripts embedding this must be written as a module-level block: after
/// the preamble, `doc` is either a Document or `None` with `_result_`
/// already set.
pub fn resolve_document(doc_name: Option<&str>) -> String {
    format!(
        r#"doc_name = {name}
doc = FreeCAD.ActiveDocument if doc_name is None else FreeCAD.getDocument(doc_name) if doc_name in FreeCAD.listDocuments() else None
if doc is None:
    _result_ = {{"success": False, "error": "No active document" if doc_name is None else "Document not found: %s" % doc_name}}
"#,
        name = py_opt_str(doc_name)
    )
}

/// Guard that stops a GUI-touching script when the event loop is down.
///
/// Placed at the top of every template whose body touches a view object or
/// the `FreeCADGui` module, so the contract holds even for callers that
/// bypass the dispatcher-level gate.
pub fn gui_guard(feature: &str) -> String {
    format!(
        r#"if not FreeCAD.GuiUp:
    _result_ = {{"success": False, "error": "GUI not available - {feature}"}}
else:
"#
    )
}

/// Indent every line of a script block by `levels` four-space steps.
pub fn indent(block: &str, levels: usize) -> String {
    let pad = "    ".repeat(levels);
    block
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_py_literal_scalars() {
        assert_eq!(py_literal(&json!(null)), "None");
        assert_eq!(py_literal(&json!(true)), "True");
        assert_eq!(py_literal(&json!(false)), "False");
        assert_eq!(py_literal(&json!(42)), "42");
        assert_eq!(py_literal(&json!(-1.5)), "-1.5");
        assert_eq!(py_literal(&json!("hello")), "\"hello\"");
    }

    #[test]
    fn test_py_literal_containers() {
        assert_eq!(py_literal(&json!([1, "a", null])), "[1, \"a\", None]");
        assert_eq!(
            py_literal(&json!({"width": 10, "label": "Box"})),
            "{\"label\": \"Box\", \"width\": 10}"
        );
    }

    #[test]
    fn test_py_str_escapes_breakout_attempts() {
        // The classic literal-breakout payload must arrive as data.
        let hostile = "foo'); bar()";
        assert_eq!(py_str(hostile), "\"foo'); bar()\"");

        let hostile = "\"; import os; os.system(\"rm -rf /\u{0}\")";
        let encoded = py_str(hostile);
        assert!(encoded.starts_with("\"\\\";"));
        assert!(encoded.contains("\\x00"));

        let newline = "line1\nline2";
        assert_eq!(py_str(newline), "\"line1\\nline2\"");
    }

    #[test]
    fn test_py_str_escapes_backslash() {
        assert_eq!(py_str(r"C:\Users\test"), r#""C:\\Users\\test""#);
    }

    #[test]
    fn test_py_opt_str() {
        assert_eq!(py_opt_str(None), "None");
        assert_eq!(py_opt_str(Some("Doc")), "\"Doc\"");
    }

    #[test]
    fn test_resolve_document_embeds_name_safely() {
        let block = resolve_document(Some("My\"Doc"));
        assert!(block.contains("doc_name = \"My\\\"Doc\""));
        assert!(block.contains("FreeCAD.ActiveDocument"));

        let block = resolve_document(None);
        assert!(block.contains("doc_name = None"));
    }

    #[test]
    fn test_gui_guard_names_feature() {
        let guard = gui_guard("screenshot capture");
        assert!(guard.contains("FreeCAD.GuiUp"));
        assert!(guard.contains("GUI not available - screenshot capture"));
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\n\nb", 1), "    a\n\n    b");
        assert_eq!(indent("x", 2), "        x");
    }
}
