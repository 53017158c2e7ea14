//! Viewing, selection, and workbench tools. Most of these touch the 3D
//! view and are GUI-gated twice: in the dispatcher and in the script.

use serde_json::json;

use super::{ParamKind, ParamSpec, ParamValues, ToolDescriptor};
use crate::script::{gui_guard, indent, py_str, resolve_document};

const CATEGORY: &str = "view";

/// View angles understood by `set_view_angle` and `get_screenshot`.
pub const VIEW_ANGLES: &[&str] = &[
    "Isometric", "Front", "Back", "Top", "Bottom", "Left", "Right", "FitAll",
];

fn doc_param() -> ParamSpec {
    ParamSpec::optional(
        "doc_name",
        ParamKind::Str,
        "Target document; active document if omitted",
    )
}

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "get_screenshot",
            description: "Capture the 3D view as a base64 PNG, optionally setting the view angle first.",
            category: CATEGORY,
            requires_ui: true,
            params: vec![
                ParamSpec::with_default("view_angle", ParamKind::Str, json!("Isometric"), "Isometric, Front, Back, Top, Bottom, Left, Right or FitAll"),
                ParamSpec::with_default("width", ParamKind::Int, json!(800), "Image width in pixels"),
                ParamSpec::with_default("height", ParamKind::Int, json!(600), "Image height in pixels"),
                doc_param(),
            ],
            template: get_screenshot,
        },
        ToolDescriptor {
            name: "set_view_angle",
            description: "Point the camera at a standard view angle.",
            category: CATEGORY,
            requires_ui: true,
            params: vec![
                ParamSpec::required("view_angle", ParamKind::Str, "Isometric, Front, Back, Top, Bottom, Left, Right or FitAll"),
                doc_param(),
            ],
            template: set_view_angle,
        },
        ToolDescriptor {
            name: "fit_all",
            description: "Zoom the camera so everything is visible.",
            category: CATEGORY,
            requires_ui: true,
            params: vec![doc_param()],
            template: fit_all,
        },
        ToolDescriptor {
            name: "zoom_in",
            description: "Zoom the 3D view in by a factor.",
            category: CATEGORY,
            requires_ui: true,
            params: vec![ParamSpec::with_default("factor", ParamKind::Number, json!(1.2), "Zoom factor per step")],
            template: zoom_in,
        },
        ToolDescriptor {
            name: "zoom_out",
            description: "Zoom the 3D view out by a factor.",
            category: CATEGORY,
            requires_ui: true,
            params: vec![ParamSpec::with_default("factor", ParamKind::Number, json!(1.2), "Zoom factor per step")],
            template: zoom_out,
        },
        ToolDescriptor {
            name: "set_camera_position",
            description: "Place the camera at a position looking at a target point.",
            category: CATEGORY,
            requires_ui: true,
            params: vec![
                ParamSpec::required("x", ParamKind::Number, "Camera X"),
                ParamSpec::required("y", ParamKind::Number, "Camera Y"),
                ParamSpec::required("z", ParamKind::Number, "Camera Z"),
                ParamSpec::with_default("target_x", ParamKind::Number, json!(0.0), "Look-at X"),
                ParamSpec::with_default("target_y", ParamKind::Number, json!(0.0), "Look-at Y"),
                ParamSpec::with_default("target_z", ParamKind::Number, json!(0.0), "Look-at Z"),
            ],
            template: set_camera_position,
        },
        ToolDescriptor {
            name: "get_selection",
            description: "List currently selected objects. Empty in headless mode.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![],
            template: get_selection,
        },
        ToolDescriptor {
            name: "set_selection",
            description: "Select the named objects, replacing the current selection.",
            category: CATEGORY,
            requires_ui: true,
            params: vec![
                ParamSpec::required("names", ParamKind::List, "Object names to select"),
                doc_param(),
            ],
            template: set_selection,
        },
        ToolDescriptor {
            name: "clear_selection",
            description: "Clear the current selection.",
            category: CATEGORY,
            requires_ui: true,
            params: vec![],
            template: clear_selection,
        },
        ToolDescriptor {
            name: "set_display_mode",
            description: "Set an object's display mode (e.g. Wireframe, Shaded, Flat Lines).",
            category: CATEGORY,
            requires_ui: true,
            params: vec![
                ParamSpec::required("name", ParamKind::Str, "Object name"),
                ParamSpec::required("mode", ParamKind::Str, "Display mode name"),
                doc_param(),
            ],
            template: set_display_mode,
        },
        ToolDescriptor {
            name: "list_parts_library",
            description: "List parts available in the FreeCAD parts library.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![],
            template: list_parts_library,
        },
        ToolDescriptor {
            name: "insert_part_from_library",
            description: "Insert a part file from the parts library into a document.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("part_path", ParamKind::Str, "Path to the part file"),
                ParamSpec::optional("name", ParamKind::Str, "Name for the inserted part"),
                ParamSpec::with_default("x", ParamKind::Number, json!(0.0), "Insert position X"),
                ParamSpec::with_default("y", ParamKind::Number, json!(0.0), "Insert position Y"),
                ParamSpec::with_default("z", ParamKind::Number, json!(0.0), "Insert position Z"),
                doc_param(),
            ],
            template: insert_part_from_library,
        },
        ToolDescriptor {
            name: "list_workbenches",
            description: "List available workbenches. Reports a fixed common set in headless mode.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![],
            template: list_workbenches,
        },
        ToolDescriptor {
            name: "activate_workbench",
            description: "Activate a workbench by name.",
            category: CATEGORY,
            requires_ui: true,
            params: vec![ParamSpec::required("name", ParamKind::Str, "Workbench name")],
            template: activate_workbench,
        },
    ]
}

/// Camera movement snippet shared by the angle-based tools.
fn apply_view_angle() -> &'static str {
    r#"if angle == "FitAll":
    view.fitAll()
elif angle == "Isometric":
    view.viewIsometric()
elif angle == "Front":
    view.viewFront()
elif angle == "Back":
    view.viewRear()
elif angle == "Top":
    view.viewTop()
elif angle == "Bottom":
    view.viewBottom()
elif angle == "Left":
    view.viewLeft()
elif angle == "Right":
    view.viewRight()
"#
}

fn active_view_or_fail() -> &'static str {
    r#"view = FreeCADGui.ActiveDocument.ActiveView if FreeCADGui.ActiveDocument else None
if view is None:
    _result_ = {"success": False, "error": "No active view"}
"#
}

fn get_screenshot(params: &ParamValues) -> String {
    let body = format!(
        r#"import base64
import os
import tempfile
{resolve}if doc is not None:
    {view_check}
    if view is not None:
        view_class = view.__class__.__name__
        if view_class not in ["View3DInventor", "View3DInventorPy"]:
            _result_ = {{"success": False, "error": "Cannot capture from %s view" % view_class}}
        else:
            angle = {angle}
{apply}
            with tempfile.NamedTemporaryFile(suffix=".png", delete=False) as f:
                temp_path = f.name
            view.saveImage(temp_path, {width}, {height}, "Current")
            with open(temp_path, "rb") as f:
                image_data = base64.b64encode(f.read()).decode("utf-8")
            os.unlink(temp_path)
            _result_ = {{
                "success": True,
                "data": image_data,
                "format": "png",
                "width": {width},
                "height": {height},
            }}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        view_check = active_view_or_fail().replace('\n', "\n    "),
        angle = params.py("view_angle"),
        apply = indent(apply_view_angle(), 3),
        width = params.i64("width"),
        height = params.i64("height"),
    );
    format!("{}{}", gui_guard("screenshot capture"), indent(&body, 1))
}

fn set_view_angle(params: &ParamValues) -> String {
    let body = format!(
        r#"{view_check}if view is not None:
    angle = {angle}
    known = {known}
    if angle not in known:
        _result_ = {{"success": False, "error": "Unknown view angle: %s" % angle}}
    else:
{apply}
        _result_ = {{"success": True, "view_angle": angle}}
"#,
        view_check = active_view_or_fail(),
        angle = params.py("view_angle"),
        known = crate::script::py_literal(&json!(VIEW_ANGLES)),
        apply = indent(apply_view_angle(), 2),
    );
    format!("{}{}", gui_guard("view control"), indent(&body, 1))
}

fn fit_all(_params: &ParamValues) -> String {
    let body = r#"FreeCADGui.SendMsgToActiveView("ViewFit")
_result_ = {"success": True}
"#;
    format!("{}{}", gui_guard("view control"), indent(body, 1))
}

fn zoom(factor_expr: String) -> String {
    let body = format!(
        r#"{view_check}if view is not None:
    cam = view.getCameraNode()
    cam.scaleHeight({factor})
    _result_ = {{"success": True}}
"#,
        view_check = active_view_or_fail(),
        factor = factor_expr,
    );
    format!("{}{}", gui_guard("view control"), indent(&body, 1))
}

fn zoom_in(params: &ParamValues) -> String {
    zoom(format!("1.0 / {}", params.f64("factor")))
}

fn zoom_out(params: &ParamValues) -> String {
    zoom(format!("{}", params.f64("factor")))
}

fn set_camera_position(params: &ParamValues) -> String {
    let body = format!(
        r#"{view_check}if view is not None:
    cam = view.getCameraNode()
    position = FreeCAD.Vector({x}, {y}, {z})
    target = FreeCAD.Vector({tx}, {ty}, {tz})
    cam.position.setValue(position.x, position.y, position.z)
    direction = target.sub(position)
    if direction.Length > 0:
        direction.normalize()
        cam.pointAt(__import__("pivy").coin.SbVec3f(target.x, target.y, target.z),
                    __import__("pivy").coin.SbVec3f(0, 0, 1))
    _result_ = {{"success": True}}
"#,
        view_check = active_view_or_fail(),
        x = params.f64("x"),
        y = params.f64("y"),
        z = params.f64("z"),
        tx = params.f64("target_x"),
        ty = params.f64("target_y"),
        tz = params.f64("target_z"),
    );
    format!("{}{}", gui_guard("camera control"), indent(&body, 1))
}

fn get_selection(_params: &ParamValues) -> String {
    r#"if not FreeCAD.GuiUp:
    _result_ = {"success": True, "selection": []}
else:
    selection = []
    for sel in FreeCADGui.Selection.getSelectionEx():
        selection.append({
            "document": sel.DocumentName,
            "object": sel.ObjectName,
            "sub_elements": list(sel.SubElementNames),
        })
    _result_ = {"success": True, "selection": selection}
"#
    .to_string()
}

fn set_selection(params: &ParamValues) -> String {
    let body = format!(
        r#"{resolve}if doc is not None:
    FreeCADGui.Selection.clearSelection()
    missing = []
    for name in {names}:
        obj = doc.getObject(name)
        if obj is None:
            missing.append(name)
        else:
            FreeCADGui.Selection.addSelection(obj)
    if missing:
        _result_ = {{"success": False, "error": "Objects not found: %s" % ", ".join(missing)}}
    else:
        _result_ = {{"success": True, "selected": {names}}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        names = params.py("names"),
    );
    format!("{}{}", gui_guard("selection"), indent(&body, 1))
}

fn clear_selection(_params: &ParamValues) -> String {
    let body = r#"FreeCADGui.Selection.clearSelection()
_result_ = {"success": True}
"#;
    format!("{}{}", gui_guard("selection"), indent(body, 1))
}

fn set_display_mode(params: &ParamValues) -> String {
    let body = format!(
        r#"{resolve}if doc is not None:
    obj = doc.getObject({name})
    if obj is None:
        _result_ = {{"success": False, "error": "Object not found: %s" % {name}}}
    else:
        mode = {mode}
        available = obj.ViewObject.listDisplayModes()
        if mode not in available:
            _result_ = {{"success": False, "error": "Unknown display mode %s; available: %s" % (mode, ", ".join(available))}}
        else:
            obj.ViewObject.DisplayMode = mode
            _result_ = {{"success": True, "name": obj.Name, "mode": mode}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        name = params.py("name"),
        mode = params.py("mode"),
    );
    format!("{}{}", gui_guard("display mode"), indent(&body, 1))
}

fn list_parts_library(_params: &ParamValues) -> String {
    r#"import os
parts = []
lib_path = os.path.join(FreeCAD.getResourceDir(), "Mod", "Parts_Library")
if not os.path.exists(lib_path):
    lib_path = os.path.expanduser("~/.FreeCAD/Mod/PartsLibrary")
if os.path.exists(lib_path):
    for root, dirs, files in os.walk(lib_path):
        category = os.path.relpath(root, lib_path)
        if category == ".":
            category = "Root"
        for f in files:
            if f.endswith((".FCStd", ".step", ".stp", ".iges", ".igs")):
                parts.append({
                    "name": f,
                    "path": os.path.join(root, f),
                    "category": category,
                })
_result_ = {"success": True, "parts": parts, "count": len(parts)}
"#
    .to_string()
}

fn insert_part_from_library(params: &ParamValues) -> String {
    format!(
        r#"import os
import Part
{resolve}if doc is not None:
    part_path = {path}
    if not os.path.exists(part_path):
        _result_ = {{"success": False, "error": "Part file not found: %s" % part_path}}
    else:
        ext = os.path.splitext(part_path)[1].lower()
        part_name = {name} or os.path.splitext(os.path.basename(part_path))[0]
        new_obj = None
        if ext == ".fcstd":
            src_doc = FreeCAD.openDocument(part_path)
            for obj in src_doc.Objects:
                if hasattr(obj, "Shape"):
                    new_obj = doc.addObject("Part::Feature", part_name)
                    new_obj.Shape = obj.Shape.copy()
                    break
            FreeCAD.closeDocument(src_doc.Name)
        else:
            shape = Part.read(part_path)
            new_obj = doc.addObject("Part::Feature", part_name)
            new_obj.Shape = shape
        if new_obj is None:
            _result_ = {{"success": False, "error": "No shape found in %s" % part_path}}
        else:
            new_obj.Placement.Base = FreeCAD.Vector({x}, {y}, {z})
            doc.recompute()
            _result_ = {{
                "success": True,
                "name": new_obj.Name,
                "label": new_obj.Label,
                "type_id": new_obj.TypeId,
            }}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        path = py_str(params.str("part_path")),
        name = params.py("name"),
        x = params.f64("x"),
        y = params.f64("y"),
        z = params.f64("z"),
    )
}

fn list_workbenches(_params: &ParamValues) -> String {
    r#"workbenches = []
if FreeCAD.GuiUp:
    active = FreeCADGui.activeWorkbench().__class__.__name__ if FreeCADGui.activeWorkbench() else None
    for name in FreeCADGui.listWorkbenches():
        workbenches.append({"name": name, "is_active": name == active})
else:
    for name in ["PartWorkbench", "PartDesignWorkbench", "DraftWorkbench",
                 "SketcherWorkbench", "MeshWorkbench"]:
        workbenches.append({"name": name, "is_active": False})
_result_ = {"success": True, "workbenches": workbenches}
"#
    .to_string()
}

fn activate_workbench(params: &ParamValues) -> String {
    let body = format!(
        r#"name = {name}
if name not in FreeCADGui.listWorkbenches():
    _result_ = {{"success": False, "error": "Unknown workbench: %s" % name}}
else:
    FreeCADGui.activateWorkbench(name)
    _result_ = {{"success": True, "workbench": name}}
"#,
        name = py_str(params.str("name")),
    );
    format!("{}{}", gui_guard("workbench activation"), indent(&body, 1))
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
    fn test_screenshot_guards_and_cleans_up() {
        let script = template_output("get_screenshot", json!({}));
        assert!(script.starts_with("if not FreeCAD.GuiUp:"));
        assert!(script.contains("GUI not available - screenshot capture"));
        assert!(script.contains("os.unlink(temp_path)"));
        assert!(script.contains("view.saveImage(temp_path, 800, 600"));
    }

    #[test]
    fn test_set_view_angle_rejects_unknown_in_script() {
        let script = template_output("set_view_angle", json!({ "view_angle": "Oblique" }));
        assert!(script.contains("Unknown view angle"));
        assert!(script.contains("\"Oblique\""));
    }

    #[test]
    fn test_get_selection_works_headless() {
        let descriptor = descriptors()
            .into_iter()
            .find(|d| d.name == "get_selection")
            .unwrap();
        assert!(!descriptor.requires_ui);
        let script = template_output("get_selection", json!({}));
        // Headless path returns an empty selection instead of an error.
        assert!(script.contains(r#""selection": []"#));
    }

    #[test]
    fn test_parts_library_tools_work_headless() {
        for name in ["list_parts_library", "insert_part_from_library"] {
            let descriptor = descriptors().into_iter().find(|d| d.name == name).unwrap();
            assert!(!descriptor.requires_ui, "{name}");
        }
        let script = template_output(
            "insert_part_from_library",
            json!({ "part_path": "/lib/bolts/M6.FCStd", "z": 5.0 }),
        );
        assert!(script.contains(r#""/lib/bolts/M6.FCStd""#));
        assert!(script.contains(".fcstd"));
        assert!(script.contains("Part.read"));
        assert!(script.contains("FreeCAD.Vector(0, 0, 5)"));
    }

    #[test]
    fn test_selection_list_is_literal_encoded() {
        let script = template_output(
            "set_selection",
            json!({ "names": ["Box", "odd\"name"] }),
        );
        assert!(script.contains(r#"["Box", "odd\"name"]"#));
    }
}
