//! Macro management tools: list, read, create, run, delete user macros.

use serde_json::json;

use super::{ParamKind, ParamSpec, ParamValues, ToolDescriptor};
use crate::script::py_str;

const CATEGORY: &str = "macros";

fn macro_name_param() -> ParamSpec {
    ParamSpec::required("name", ParamKind::Str, "Macro name without the .FCMacro suffix")
}

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "list_macros",
            description: "List installed macros from the user and system macro directories.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![],
            template: list_macros,
        },
        ToolDescriptor {
            name: "read_macro",
            description: "Read the source of a macro.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![macro_name_param()],
            template: read_macro,
        },
        ToolDescriptor {
            name: "create_macro",
            description: "Create (or overwrite) a user macro with the given source.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                macro_name_param(),
                ParamSpec::required("code", ParamKind::Str, "Macro source code"),
                ParamSpec::with_default("description", ParamKind::Str, json!(""), "One-line description comment"),
            ],
            template: create_macro,
        },
        ToolDescriptor {
            name: "create_macro_from_template",
            description: "Create a user macro from a predefined starting template.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                macro_name_param(),
                ParamSpec::with_default(
                    "template",
                    ParamKind::Str,
                    json!("basic"),
                    "One of: basic, part, sketch, gui, selection",
                ),
                ParamSpec::with_default("description", ParamKind::Str, json!(""), "One-line description comment"),
            ],
            template: create_macro_from_template,
        },
        ToolDescriptor {
            name: "run_macro",
            description: "Execute a macro by name.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![macro_name_param()],
            template: run_macro,
        },
        ToolDescriptor {
            name: "delete_macro",
            description: "Delete a user macro. System macros cannot be deleted.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![macro_name_param()],
            template: delete_macro,
        },
    ]
}

/// Locate a macro file by name across user and system directories.
fn find_macro(name_literal: &str) -> String {
    format!(
        r#"import os
name = {name}
macro_file = None
is_system = False
user_path = FreeCAD.getUserMacroDir(True)
candidate = os.path.join(user_path, name + ".FCMacro")
if os.path.exists(candidate):
    macro_file = candidate
if macro_file is None:
    system_path = os.path.join(FreeCAD.getResourceDir(), "Macro")
    candidate = os.path.join(system_path, name + ".FCMacro")
    if os.path.exists(candidate):
        macro_file = candidate
        is_system = True
if macro_file is None:
    _result_ = {{"success": False, "error": "Macro not found: %s" % name}}
"#,
        name = name_literal,
    )
}

fn list_macros(_params: &ParamValues) -> String {
    r##"import os
paths = []
user_path = FreeCAD.getUserMacroDir(True)
if os.path.isdir(user_path):
    paths.append((False, user_path))
system_path = os.path.join(FreeCAD.getResourceDir(), "Macro")
if os.path.isdir(system_path):
    paths.append((True, system_path))

macros = []
for is_system, path in paths:
    for filename in sorted(os.listdir(path)):
        if not filename.endswith(".FCMacro"):
            continue
        macro_file = os.path.join(path, filename)
        description = ""
        try:
            with open(macro_file, "r") as f:
                for line in f:
                    if line.startswith("#"):
                        text = line.lstrip("#").strip()
                        if text and not text.startswith("!") and not text.startswith("-*-"):
                            description = text
                            break
        except Exception:
            pass
        macros.append({
            "name": filename[:-8],
            "path": macro_file,
            "description": description,
            "is_system": is_system,
        })
_result_ = {"success": True, "macros": macros, "count": len(macros)}
"##
    .to_string()
}

fn read_macro(params: &ParamValues) -> String {
    format!(
        r#"{find}if macro_file is not None:
    with open(macro_file, "r") as f:
        source = f.read()
    _result_ = {{"success": True, "name": name, "path": macro_file, "code": source, "is_system": is_system}}
"#,
        find = find_macro(&py_str(params.str("name"))),
    )
}

fn create_macro(params: &ParamValues) -> String {
    format!(
        r##"import os
macro_path = FreeCAD.getUserMacroDir(True)
os.makedirs(macro_path, exist_ok=True)
macro_file = os.path.join(macro_path, {name} + ".FCMacro")
description = {description}
header = ("# %s\n\n" % description) if description else ""
with open(macro_file, "w") as f:
    f.write(header + {code})
_result_ = {{"success": True, "name": {name}, "path": macro_file}}
"##,
        name = py_str(params.str("name")),
        description = params.py("description"),
        code = py_str(params.str("code")),
    )
}

/// Macro starting points keyed by template name.
const MACRO_TEMPLATES: &[(&str, &str)] = &[
    (
        "basic",
        r#"doc = FreeCAD.ActiveDocument
if doc is None:
    doc = FreeCAD.newDocument("MacroDoc")

# Add your operations here
print("Macro executed successfully!")
"#,
    ),
    (
        "part",
        r#"import Part

doc = FreeCAD.ActiveDocument
if doc is None:
    doc = FreeCAD.newDocument("MacroDoc")

box = doc.addObject("Part::Box", "MyBox")
box.Length = 10
box.Width = 20
box.Height = 30

doc.recompute()
print("Created box with volume: %s" % box.Shape.Volume)
"#,
    ),
    (
        "sketch",
        r#"import Part
import Sketcher

doc = FreeCAD.ActiveDocument
if doc is None:
    doc = FreeCAD.newDocument("MacroDoc")

sketch = doc.addObject("Sketcher::SketchObject", "MySketch")
sketch.addGeometry(Part.LineSegment(FreeCAD.Vector(0, 0, 0), FreeCAD.Vector(10, 0, 0)), False)
sketch.addGeometry(Part.LineSegment(FreeCAD.Vector(10, 0, 0), FreeCAD.Vector(10, 10, 0)), False)
sketch.addGeometry(Part.LineSegment(FreeCAD.Vector(10, 10, 0), FreeCAD.Vector(0, 10, 0)), False)
sketch.addGeometry(Part.LineSegment(FreeCAD.Vector(0, 10, 0), FreeCAD.Vector(0, 0, 0)), False)

doc.recompute()
print("Created sketch with rectangle")
"#,
    ),
    (
        "gui",
        r#"if not FreeCAD.GuiUp:
    print("This macro needs the FreeCAD GUI")
else:
    from PySide2 import QtWidgets

    mw = FreeCADGui.getMainWindow()
    QtWidgets.QMessageBox.information(mw, "Macro", "Hello from a macro dialog")
"#,
    ),
    (
        "selection",
        r#"if not FreeCAD.GuiUp:
    print("Selection requires the FreeCAD GUI")
else:
    selection = FreeCADGui.Selection.getSelectionEx()
    if not selection:
        print("Nothing selected")
    for sel in selection:
        print("%s.%s: %s" % (sel.DocumentName, sel.ObjectName, sel.SubElementNames))
"#,
    ),
];

fn create_macro_from_template(params: &ParamValues) -> String {
    let requested = params.opt_str("template").unwrap_or("basic");
    let body = MACRO_TEMPLATES
        .iter()
        .find(|(name, _)| *name == requested)
        .map(|(_, body)| *body);

    let Some(body) = body else {
        let known: Vec<&str> = MACRO_TEMPLATES.iter().map(|(name, _)| *name).collect();
        return format!(
            r#"_result_ = {{"success": False, "error": "Unknown template: %s; available: {known}" % {requested}}}
"#,
            known = known.join(", "),
            requested = py_str(requested),
        );
    };

    format!(
        r##"import os
macro_path = FreeCAD.getUserMacroDir(True)
os.makedirs(macro_path, exist_ok=True)
macro_file = os.path.join(macro_path, {name} + ".FCMacro")
description = {description}
header = ("# %s\n\n" % description) if description else ""
with open(macro_file, "w") as f:
    f.write(header + {body})
_result_ = {{"success": True, "name": {name}, "path": macro_file, "template": {template}}}
"##,
        name = py_str(params.str("name")),
        description = params.py("description"),
        body = py_str(body),
        template = py_str(requested),
    )
}

fn run_macro(params: &ParamValues) -> String {
    format!(
        r#"{find}if macro_file is not None:
    with open(macro_file, "r") as f:
        macro_code = f.read()
    macro_globals = {{"FreeCAD": FreeCAD, "App": FreeCAD, "__file__": macro_file}}
    if FreeCAD.GuiUp:
        macro_globals["FreeCADGui"] = FreeCADGui
        macro_globals["Gui"] = FreeCADGui
    exec(compile(macro_code, macro_file, "exec"), macro_globals)
    _result_ = {{"success": True, "name": name, "path": macro_file}}
"#,
        find = find_macro(&py_str(params.str("name"))),
    )
}

fn delete_macro(params: &ParamValues) -> String {
    format!(
        r#"{find}if macro_file is not None:
    if is_system:
        _result_ = {{"success": False, "error": "Cannot delete system macro: %s" % name}}
    else:
        os.remove(macro_file)
        _result_ = {{"success": True, "deleted": name}}
"#,
        find = find_macro(&py_str(params.str("name"))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn template_output(name: &str, args: serde_json::Value) -> String {
        let descriptor = descriptors().into_iter().find(|d| d.name == name).unwrap();
        let map: HashMap<String, serde_json::Value> = serde_json::from_value(args).unwrap();
        let params = ParamValues::validate(&descriptor.params, map).unwrap();
        (descriptor.template)(&params)
    }

    #[test]
    fn test_create_macro_embeds_code_as_literal() {
        let script = template_output(
            "create_macro",
            json!({ "name": "Widget", "code": "print('hi')\nimport os" }),
        );
        // The macro body must be written as data, not spliced into this script.
        assert!(script.contains(r#""print('hi')\nimport os""#));
    }

    #[test]
    fn test_delete_refuses_system_macros() {
        let script = template_output("delete_macro", json!({ "name": "Demo" }));
        assert!(script.contains("Cannot delete system macro"));
        assert!(script.contains("os.remove(macro_file)"));
    }

    #[test]
    fn test_macro_template_body_written_as_literal() {
        let script = template_output(
            "create_macro_from_template",
            json!({ "name": "PartStarter", "template": "part" }),
        );
        // The template body is data inside this script, not inline code.
        assert!(script.contains(r#"\"Part::Box\""#));
        assert!(script.contains(r#""template": "part""#));
        assert!(!script.contains("\nimport Part\n"));
    }

    #[test]
    fn test_unknown_macro_template_fails_locally() {
        let script = template_output(
            "create_macro_from_template",
            json!({ "name": "X", "template": "quantum" }),
        );
        assert!(script.contains("Unknown template"));
        assert!(script.contains("basic, part, sketch, gui, selection"));
    }

    #[test]
    fn test_run_macro_compiles_with_file_name() {
        let script = template_output("run_macro", json!({ "name": "Demo" }));
        assert!(script.contains("compile(macro_code, macro_file"));
    }
}
