//! Generic document-object manipulation tools.

use serde_json::json;

use super::{ParamKind, ParamSpec, ParamValues, ToolDescriptor};
use crate::script::resolve_document;

const CATEGORY: &str = "objects";

fn doc_param() -> ParamSpec {
    ParamSpec::optional(
        "doc_name",
        ParamKind::Str,
        "Target document; active document if omitted",
    )
}

fn name_param() -> ParamSpec {
    ParamSpec::required("name", ParamKind::Str, "Object name")
}

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "list_objects",
            description: "List all objects in a document with type and visibility.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![doc_param()],
            template: list_objects,
        },
        ToolDescriptor {
            name: "inspect_object",
            description: "Inspect one object: properties, shape statistics, dependency links.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![name_param(), doc_param()],
            template: inspect_object,
        },
        ToolDescriptor {
            name: "create_object",
            description: "Create an object of an arbitrary type id (e.g. Part::Box) with properties.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("type_id", ParamKind::Str, "FreeCAD type id, e.g. Part::Box"),
                ParamSpec::optional("name", ParamKind::Str, "Object name; auto-generated if omitted"),
                ParamSpec::optional("properties", ParamKind::Object, "Property name/value pairs to set"),
                doc_param(),
            ],
            template: create_object,
        },
        ToolDescriptor {
            name: "edit_object",
            description: "Set properties on an existing object and recompute.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                name_param(),
                ParamSpec::required("properties", ParamKind::Object, "Property name/value pairs to set"),
                doc_param(),
            ],
            template: edit_object,
        },
        ToolDescriptor {
            name: "delete_object",
            description: "Remove an object from a document.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![name_param(), doc_param()],
            template: delete_object,
        },
        ToolDescriptor {
            name: "copy_object",
            description: "Copy an object within its document.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                name_param(),
                ParamSpec::optional("new_name", ParamKind::Str, "Name for the copy"),
                doc_param(),
            ],
            template: copy_object,
        },
        ToolDescriptor {
            name: "set_placement",
            description: "Set an object's absolute position and rotation.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                name_param(),
                ParamSpec::with_default("x", ParamKind::Number, json!(0.0), "X position in mm"),
                ParamSpec::with_default("y", ParamKind::Number, json!(0.0), "Y position in mm"),
                ParamSpec::with_default("z", ParamKind::Number, json!(0.0), "Z position in mm"),
                ParamSpec::with_default("angle", ParamKind::Number, json!(0.0), "Rotation angle in degrees"),
                ParamSpec::with_default("axis_x", ParamKind::Number, json!(0.0), "Rotation axis X"),
                ParamSpec::with_default("axis_y", ParamKind::Number, json!(0.0), "Rotation axis Y"),
                ParamSpec::with_default("axis_z", ParamKind::Number, json!(1.0), "Rotation axis Z"),
                doc_param(),
            ],
            template: set_placement,
        },
        ToolDescriptor {
            name: "rotate_object",
            description: "Rotate an object around an axis, relative to its current placement.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                name_param(),
                ParamSpec::required("angle", ParamKind::Number, "Rotation angle in degrees"),
                ParamSpec::with_default("axis_x", ParamKind::Number, json!(0.0), "Rotation axis X"),
                ParamSpec::with_default("axis_y", ParamKind::Number, json!(0.0), "Rotation axis Y"),
                ParamSpec::with_default("axis_z", ParamKind::Number, json!(1.0), "Rotation axis Z"),
                doc_param(),
            ],
            template: rotate_object,
        },
        ToolDescriptor {
            name: "scale_object",
            description: "Scale an object's shape uniformly, replacing it with a scaled copy.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                name_param(),
                ParamSpec::required("factor", ParamKind::Number, "Uniform scale factor"),
                doc_param(),
            ],
            template: scale_object,
        },
        ToolDescriptor {
            name: "mirror_object",
            description: "Mirror an object's shape across a plane through the origin.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                name_param(),
                ParamSpec::with_default("normal_x", ParamKind::Number, json!(1.0), "Plane normal X"),
                ParamSpec::with_default("normal_y", ParamKind::Number, json!(0.0), "Plane normal Y"),
                ParamSpec::with_default("normal_z", ParamKind::Number, json!(0.0), "Plane normal Z"),
                doc_param(),
            ],
            template: mirror_object,
        },
        ToolDescriptor {
            name: "boolean_operation",
            description: "Combine two shapes with a boolean: union, cut, or intersection.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("operation", ParamKind::Str, "One of: union, cut, intersection"),
                ParamSpec::required("base", ParamKind::Str, "Base object name"),
                ParamSpec::required("tool", ParamKind::Str, "Tool object name"),
                ParamSpec::optional("name", ParamKind::Str, "Result object name"),
                doc_param(),
            ],
            template: boolean_operation,
        },
        ToolDescriptor {
            name: "set_object_visibility",
            description: "Show or hide an object in the 3D view.",
            category: CATEGORY,
            requires_ui: true,
            params: vec![
                name_param(),
                ParamSpec::required("visible", ParamKind::Bool, "True to show, false to hide"),
                doc_param(),
            ],
            template: set_object_visibility,
        },
        ToolDescriptor {
            name: "set_object_color",
            description: "Set an object's display color (RGB, 0-1 floats).",
            category: CATEGORY,
            requires_ui: true,
            params: vec![
                name_param(),
                ParamSpec::required("r", ParamKind::Number, "Red component, 0-1"),
                ParamSpec::required("g", ParamKind::Number, "Green component, 0-1"),
                ParamSpec::required("b", ParamKind::Number, "Blue component, 0-1"),
                doc_param(),
            ],
            template: set_object_color,
        },
    ]
}

/// Resolve document, then object, with controlled failures for both.
fn resolve_object(doc_name: Option<&str>, name_literal: &str) -> String {
    format!(
        r#"{resolve}obj = None
if doc is not None:
    obj = doc.getObject({name})
    if obj is None:
        _result_ = {{"success": False, "error": "Object not found: %s" % {name}}}
"#,
        resolve = resolve_document(doc_name),
        name = name_literal,
    )
}

fn list_objects(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    objects = []
    for obj in doc.Objects:
        objects.append({{
            "name": obj.Name,
            "label": obj.Label,
            "type_id": obj.TypeId,
            "visibility": obj.ViewObject.Visibility if hasattr(obj, "ViewObject") and obj.ViewObject else True,
        }})
    _result_ = {{"success": True, "objects": objects, "count": len(objects)}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
    )
}

fn inspect_object(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if obj is not None:
    props = {{}}
    for prop in obj.PropertiesList:
        try:
            val = getattr(obj, prop)
            if hasattr(val, '__class__') and val.__class__.__module__ != 'builtins':
                val = str(val)
            props[prop] = val
        except Exception:
            props[prop] = "<unreadable>"
    shape_info = None
    if hasattr(obj, "Shape"):
        shape = obj.Shape
        shape_info = {{
            "shape_type": shape.ShapeType,
            "volume": shape.Volume if hasattr(shape, "Volume") else None,
            "area": shape.Area if hasattr(shape, "Area") else None,
            "is_valid": shape.isValid(),
            "vertex_count": len(shape.Vertexes) if hasattr(shape, "Vertexes") else 0,
            "edge_count": len(shape.Edges) if hasattr(shape, "Edges") else 0,
            "face_count": len(shape.Faces) if hasattr(shape, "Faces") else 0,
        }}
    _result_ = {{
        "success": True,
        "name": obj.Name,
        "label": obj.Label,
        "type_id": obj.TypeId,
        "properties": props,
        "shape_info": shape_info,
        "children": [c.Name for c in obj.OutList] if hasattr(obj, "OutList") else [],
        "parents": [p.Name for p in obj.InList] if hasattr(obj, "InList") else [],
    }}
"#,
        resolve = resolve_object(params.opt_str("doc_name"), &params.py("name")),
    )
}

fn create_object(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.addObject({type_id}, {name} or "")
    for prop_name, prop_val in ({props} or {{}}).items():
        if hasattr(obj, prop_name):
            setattr(obj, prop_name, prop_val)
    doc.recompute()
    _result_ = {{"success": True, "name": obj.Name, "label": obj.Label, "type_id": obj.TypeId}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        type_id = params.py("type_id"),
        name = params.py("name"),
        props = params.py("properties"),
    )
}

fn edit_object(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if obj is not None:
    missing = []
    for prop_name, prop_val in ({props} or {{}}).items():
        if hasattr(obj, prop_name):
            setattr(obj, prop_name, prop_val)
        else:
            missing.append(prop_name)
    doc.recompute()
    _result_ = {{"success": True, "name": obj.Name, "skipped_properties": missing}}
"#,
        resolve = resolve_object(params.opt_str("doc_name"), &params.py("name")),
        props = params.py("properties"),
    )
}

fn delete_object(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if obj is not None:
    name = obj.Name
    doc.removeObject(name)
    _result_ = {{"success": True, "deleted": name}}
"#,
        resolve = resolve_object(params.opt_str("doc_name"), &params.py("name")),
    )
}

fn copy_object(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if obj is not None:
    copy = doc.copyObject(obj, False)
    if {new_name}:
        copy.Label = {new_name}
    doc.recompute()
    _result_ = {{"success": True, "name": copy.Name, "label": copy.Label}}
"#,
        resolve = resolve_object(params.opt_str("doc_name"), &params.py("name")),
        new_name = params.py("new_name"),
    )
}

fn set_placement(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if obj is not None:
    obj.Placement = FreeCAD.Placement(
        FreeCAD.Vector({x}, {y}, {z}),
        FreeCAD.Rotation(FreeCAD.Vector({ax}, {ay}, {az}), {angle}),
    )
    doc.recompute()
    _result_ = {{"success": True, "name": obj.Name, "placement": str(obj.Placement)}}
"#,
        resolve = resolve_object(params.opt_str("doc_name"), &params.py("name")),
        x = params.f64("x"),
        y = params.f64("y"),
        z = params.f64("z"),
        ax = params.f64("axis_x"),
        ay = params.f64("axis_y"),
        az = params.f64("axis_z"),
        angle = params.f64("angle"),
    )
}

fn rotate_object(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if obj is not None:
    rotation = FreeCAD.Rotation(FreeCAD.Vector({ax}, {ay}, {az}), {angle})
    obj.Placement.Rotation = rotation.multiply(obj.Placement.Rotation)
    doc.recompute()
    _result_ = {{"success": True, "name": obj.Name, "placement": str(obj.Placement)}}
"#,
        resolve = resolve_object(params.opt_str("doc_name"), &params.py("name")),
        ax = params.f64("axis_x"),
        ay = params.f64("axis_y"),
        az = params.f64("axis_z"),
        angle = params.f64("angle"),
    )
}

fn scale_object(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if obj is not None:
    if not hasattr(obj, "Shape"):
        _result_ = {{"success": False, "error": "Object has no shape: %s" % obj.Name}}
    else:
        matrix = FreeCAD.Matrix()
        matrix.scale({factor}, {factor}, {factor})
        scaled = obj.Shape.transformGeometry(matrix)
        new_obj = doc.addObject("Part::Feature", obj.Name + "_scaled")
        new_obj.Shape = scaled
        doc.recompute()
        _result_ = {{"success": True, "name": new_obj.Name, "source": obj.Name}}
"#,
        resolve = resolve_object(params.opt_str("doc_name"), &params.py("name")),
        factor = params.f64("factor"),
    )
}

fn mirror_object(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if obj is not None:
    if not hasattr(obj, "Shape"):
        _result_ = {{"success": False, "error": "Object has no shape: %s" % obj.Name}}
    else:
        mirrored = obj.Shape.mirror(FreeCAD.Vector(0, 0, 0), FreeCAD.Vector({nx}, {ny}, {nz}))
        new_obj = doc.addObject("Part::Feature", obj.Name + "_mirrored")
        new_obj.Shape = mirrored
        doc.recompute()
        _result_ = {{"success": True, "name": new_obj.Name, "source": obj.Name}}
"#,
        resolve = resolve_object(params.opt_str("doc_name"), &params.py("name")),
        nx = params.f64("normal_x"),
        ny = params.f64("normal_y"),
        nz = params.f64("normal_z"),
    )
}

fn boolean_operation(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    op = {op}
    type_map = {{"union": "Part::Fuse", "cut": "Part::Cut", "intersection": "Part::Common"}}
    if op not in type_map:
        _result_ = {{"success": False, "error": "Unknown operation: %s" % op}}
    else:
        base = doc.getObject({base})
        tool = doc.getObject({tool})
        if base is None or tool is None:
            _result_ = {{"success": False, "error": "Base or tool object not found"}}
        else:
            result = doc.addObject(type_map[op], {name} or op.capitalize())
            result.Base = base
            result.Tool = tool
            doc.recompute()
            _result_ = {{"success": True, "name": result.Name, "operation": op}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        op = params.py("operation"),
        base = params.py("base"),
        tool = params.py("tool"),
        name = params.py("name"),
    )
}

fn set_object_visibility(params: &ParamValues) -> String {
    let body = format!(
        r#"{resolve}if obj is not None:
    obj.ViewObject.Visibility = {visible}
    _result_ = {{"success": True, "name": obj.Name, "visible": {visible}}}
"#,
        resolve = resolve_object(params.opt_str("doc_name"), &params.py("name")),
        visible = if params.bool("visible") { "True" } else { "False" },
    );
    format!(
        "{guard}{indented}",
        guard = crate::script::gui_guard("object visibility"),
        indented = crate::script::indent(&body, 1),
    )
}

fn set_object_color(params: &ParamValues) -> String {
    let body = format!(
        r#"{resolve}if obj is not None:
    obj.ViewObject.ShapeColor = ({r}, {g}, {b})
    _result_ = {{"success": True, "name": obj.Name, "color": [{r}, {g}, {b}]}}
"#,
        resolve = resolve_object(params.opt_str("doc_name"), &params.py("name")),
        r = params.f64("r"),
        g = params.f64("g"),
        b = params.f64("b"),
    );
    format!(
        "{guard}{indented}",
        guard = crate::script::gui_guard("object color"),
        indented = crate::script::indent(&body, 1),
    )
}
