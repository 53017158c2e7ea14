//! Document lifecycle tools.

use serde_json::json;

use super::{ParamKind, ParamSpec, ParamValues, ToolDescriptor};
use crate::script::{py_opt_str, py_str, resolve_document};

const CATEGORY: &str = "documents";

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "list_documents",
            description: "List all open FreeCAD documents with their labels, paths and objects.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![],
            template: list_documents,
        },
        ToolDescriptor {
            name: "get_active_document",
            description: "Get the currently active FreeCAD document, or a failure if none is open.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![],
            template: get_active_document,
        },
        ToolDescriptor {
            name: "create_document",
            description: "Create a new FreeCAD document and make it active.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::with_default("name", ParamKind::Str, json!("Unnamed"), "Internal document name"),
                ParamSpec::optional("label", ParamKind::Str, "Display label; defaults to the name"),
            ],
            template: create_document,
        },
        ToolDescriptor {
            name: "open_document",
            description: "Open an existing FreeCAD document from a .FCStd file path.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![ParamSpec::required("path", ParamKind::Str, "Full path to the .FCStd file")],
            template: open_document,
        },
        ToolDescriptor {
            name: "save_document",
            description: "Save a document to its existing path, or to a new path if given.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::optional("doc_name", ParamKind::Str, "Document to save; active document if omitted"),
                ParamSpec::optional("path", ParamKind::Str, "Save path; required for never-saved documents"),
            ],
            template: save_document,
        },
        ToolDescriptor {
            name: "close_document",
            description: "Close a document, discarding unsaved changes.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![ParamSpec::optional(
                "doc_name",
                ParamKind::Str,
                "Document to close; active document if omitted",
            )],
            template: close_document,
        },
        ToolDescriptor {
            name: "recompute_document",
            description: "Recompute a document so dependent objects update.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![ParamSpec::optional(
                "doc_name",
                ParamKind::Str,
                "Document to recompute; active document if omitted",
            )],
            template: recompute_document,
        },
        ToolDescriptor {
            name: "recompute",
            description: "Force a full recompute by touching every object first.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![ParamSpec::optional(
                "doc_name",
                ParamKind::Str,
                "Document to recompute; active document if omitted",
            )],
            template: recompute,
        },
        ToolDescriptor {
            name: "undo",
            description: "Undo the last transaction in a document.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![ParamSpec::optional(
                "doc_name",
                ParamKind::Str,
                "Target document; active document if omitted",
            )],
            template: undo,
        },
        ToolDescriptor {
            name: "redo",
            description: "Redo the last undone transaction in a document.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![ParamSpec::optional(
                "doc_name",
                ParamKind::Str,
                "Target document; active document if omitted",
            )],
            template: redo,
        },
        ToolDescriptor {
            name: "get_undo_redo_status",
            description: "Report available undo/redo transaction names for a document.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![ParamSpec::optional(
                "doc_name",
                ParamKind::Str,
                "Target document; active document if omitted",
            )],
            template: undo_redo_status,
        },
    ]
}

fn doc_summary() -> &'static str {
    r#"{
        "success": True,
        "name": doc.Name,
        "label": doc.Label,
        "path": doc.FileName or None,
        "objects": [obj.Name for obj in doc.Objects],
        "is_modified": doc.Modified if hasattr(doc, "Modified") else False,
    }"#
}

fn list_documents(_params: &ParamValues) -> String {
    r#"docs = []
for doc in FreeCAD.listDocuments().values():
    docs.append({
        "name": doc.Name,
        "label": doc.Label,
        "path": doc.FileName or None,
        "object_count": len(doc.Objects),
        "is_modified": doc.Modified if hasattr(doc, "Modified") else False,
        "active_object": doc.ActiveObject.Name if doc.ActiveObject else None,
    })
_result_ = {"success": True, "documents": docs, "count": len(docs)}
"#
    .to_string()
}

fn get_active_document(_params: &ParamValues) -> String {
    format!(
        r#"doc = FreeCAD.ActiveDocument
if doc is None:
    _result_ = {{"success": False, "error": "No active document"}}
else:
    _result_ = {summary}
"#,
        summary = doc_summary()
    )
}

fn create_document(params: &ParamValues) -> String {
    let name = params.opt_str("name").unwrap_or("Unnamed");
    let label = params.opt_str("label").unwrap_or(name);
    format!(
        r#"doc = FreeCAD.newDocument({name})
doc.Label = {label}
_result_ = {{"success": True, "name": doc.Name, "label": doc.Label, "path": None}}
"#,
        name = py_str(name),
        label = py_str(label),
    )
}

fn open_document(params: &ParamValues) -> String {
    format!(
        r#"import os
path = {path}
if not os.path.exists(path):
    _result_ = {{"success": False, "error": "File not found: %s" % path}}
else:
    doc = FreeCAD.openDocument(path)
    _result_ = {summary}
"#,
        path = py_str(params.str("path")),
        summary = doc_summary(),
    )
}

fn save_document(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    save_path = {path} or doc.FileName
    if not save_path:
        _result_ = {{"success": False, "error": "No path specified for unsaved document"}}
    else:
        doc.saveAs(save_path)
        _result_ = {{"success": True, "path": save_path}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        path = py_opt_str(params.opt_str("path")),
    )
}

fn close_document(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    name = doc.Name
    FreeCAD.closeDocument(name)
    _result_ = {{"success": True, "closed": name}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
    )
}

fn recompute_document(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    doc.recompute()
    _result_ = {{"success": True, "name": doc.Name}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
    )
}

fn recompute(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    touch_count = 0
    for obj in doc.Objects:
        if hasattr(obj, "touch"):
            obj.touch()
            touch_count += 1
    doc.recompute()
    _result_ = {{"success": True, "touch_count": touch_count}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
    )
}

fn undo(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    if doc.UndoCount == 0:
        _result_ = {{"success": False, "error": "Nothing to undo"}}
    else:
        doc.undo()
        _result_ = {{"success": True, "undo_count": doc.UndoCount}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
    )
}

fn redo(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    if doc.RedoCount == 0:
        _result_ = {{"success": False, "error": "Nothing to redo"}}
    else:
        doc.redo()
        _result_ = {{"success": True, "redo_count": doc.RedoCount}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
    )
}

fn undo_redo_status(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    _result_ = {{
        "success": True,
        "undo_count": doc.UndoCount,
        "redo_count": doc.RedoCount,
        "undo_names": list(doc.UndoNames),
        "redo_names": list(doc.RedoNames),
    }}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn params_for(descriptor: &ToolDescriptor, args: serde_json::Value) -> ParamValues {
        let map: HashMap<String, serde_json::Value> =
            serde_json::from_value(args).unwrap();
        ParamValues::validate(&descriptor.params, map).unwrap()
    }

    #[test]
    fn test_create_document_embeds_names_safely() {
        let descriptor = descriptors()
            .into_iter()
            .find(|d| d.name == "create_document")
            .unwrap();
        let params = params_for(&descriptor, json!({ "name": "My\"Doc" }));
        let script = (descriptor.template)(&params);
        assert!(script.contains(r#"newDocument("My\"Doc")"#));
    }

    #[test]
    fn test_save_without_path_uses_existing() {
        let descriptor = descriptors()
            .into_iter()
            .find(|d| d.name == "save_document")
            .unwrap();
        let params = params_for(&descriptor, json!({}));
        let script = (descriptor.template)(&params);
        assert!(script.contains("None or doc.FileName"));
    }

    #[test]
    fn test_open_document_checks_existence_first() {
        let descriptor = descriptors()
            .into_iter()
            .find(|d| d.name == "open_document")
            .unwrap();
        let params = params_for(&descriptor, json!({ "path": "/tmp/part.FCStd" }));
        let script = (descriptor.template)(&params);
        assert!(script.contains("os.path.exists"));
        assert!(script.contains("\"/tmp/part.FCStd\""));
    }

    #[test]
    fn test_recompute_touches_before_recomputing() {
        let descriptor = descriptors()
            .into_iter()
            .find(|d| d.name == "recompute")
            .unwrap();
        let params = params_for(&descriptor, json!({}));
        let script = (descriptor.template)(&params);
        assert!(script.contains("obj.touch()"));
        assert!(script.contains("touch_count"));
    }

    #[test]
    fn test_no_document_tool_requires_ui() {
        for descriptor in descriptors() {
            assert!(!descriptor.requires_ui, "{}", descriptor.name);
        }
    }
}
