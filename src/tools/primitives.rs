//! Part primitive creation tools.
//!
//! Each template creates one parametric Part feature in the target
//! document and recomputes.

use serde_json::json;

use super::{ParamKind, ParamSpec, ParamValues, ToolDescriptor};
use crate::script::resolve_document;

const CATEGORY: &str = "primitives";

fn doc_param() -> ParamSpec {
    ParamSpec::optional(
        "doc_name",
        ParamKind::Str,
        "Target document; active document if omitted",
    )
}

fn placement_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::with_default("x", ParamKind::Number, json!(0.0), "X position in mm"),
        ParamSpec::with_default("y", ParamKind::Number, json!(0.0), "Y position in mm"),
        ParamSpec::with_default("z", ParamKind::Number, json!(0.0), "Z position in mm"),
    ]
}

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "create_box",
            description: "Create a parametric box (Part::Box).",
            category: CATEGORY,
            requires_ui: false,
            params: [
                vec![
                    ParamSpec::with_default("name", ParamKind::Str, json!("Box"), "Object name"),
                    ParamSpec::with_default("length", ParamKind::Number, json!(10.0), "Length (X) in mm"),
                    ParamSpec::with_default("width", ParamKind::Number, json!(10.0), "Width (Y) in mm"),
                    ParamSpec::with_default("height", ParamKind::Number, json!(10.0), "Height (Z) in mm"),
                    doc_param(),
                ],
                placement_params(),
            ]
            .concat(),
            template: create_box,
        },
        ToolDescriptor {
            name: "create_cylinder",
            description: "Create a parametric cylinder (Part::Cylinder).",
            category: CATEGORY,
            requires_ui: false,
            params: [
                vec![
                    ParamSpec::with_default("name", ParamKind::Str, json!("Cylinder"), "Object name"),
                    ParamSpec::with_default("radius", ParamKind::Number, json!(5.0), "Radius in mm"),
                    ParamSpec::with_default("height", ParamKind::Number, json!(10.0), "Height in mm"),
                    ParamSpec::with_default("angle", ParamKind::Number, json!(360.0), "Sweep angle in degrees"),
                    doc_param(),
                ],
                placement_params(),
            ]
            .concat(),
            template: create_cylinder,
        },
        ToolDescriptor {
            name: "create_sphere",
            description: "Create a parametric sphere (Part::Sphere).",
            category: CATEGORY,
            requires_ui: false,
            params: [
                vec![
                    ParamSpec::with_default("name", ParamKind::Str, json!("Sphere"), "Object name"),
                    ParamSpec::with_default("radius", ParamKind::Number, json!(5.0), "Radius in mm"),
                    doc_param(),
                ],
                placement_params(),
            ]
            .concat(),
            template: create_sphere,
        },
        ToolDescriptor {
            name: "create_cone",
            description: "Create a parametric cone (Part::Cone).",
            category: CATEGORY,
            requires_ui: false,
            params: [
                vec![
                    ParamSpec::with_default("name", ParamKind::Str, json!("Cone"), "Object name"),
                    ParamSpec::with_default("radius1", ParamKind::Number, json!(5.0), "Bottom radius in mm"),
                    ParamSpec::with_default("radius2", ParamKind::Number, json!(0.0), "Top radius in mm"),
                    ParamSpec::with_default("height", ParamKind::Number, json!(10.0), "Height in mm"),
                    doc_param(),
                ],
                placement_params(),
            ]
            .concat(),
            template: create_cone,
        },
        ToolDescriptor {
            name: "create_torus",
            description: "Create a parametric torus (Part::Torus).",
            category: CATEGORY,
            requires_ui: false,
            params: [
                vec![
                    ParamSpec::with_default("name", ParamKind::Str, json!("Torus"), "Object name"),
                    ParamSpec::with_default("radius1", ParamKind::Number, json!(10.0), "Ring radius in mm"),
                    ParamSpec::with_default("radius2", ParamKind::Number, json!(2.0), "Tube radius in mm"),
                    doc_param(),
                ],
                placement_params(),
            ]
            .concat(),
            template: create_torus,
        },
        ToolDescriptor {
            name: "create_wedge",
            description: "Create a parametric wedge (Part::Wedge).",
            category: CATEGORY,
            requires_ui: false,
            params: [
                vec![
                    ParamSpec::with_default("name", ParamKind::Str, json!("Wedge"), "Object name"),
                    ParamSpec::with_default("xmax", ParamKind::Number, json!(10.0), "X extent in mm"),
                    ParamSpec::with_default("ymax", ParamKind::Number, json!(10.0), "Y extent in mm"),
                    ParamSpec::with_default("zmax", ParamKind::Number, json!(10.0), "Z extent in mm"),
                    ParamSpec::with_default("x2max", ParamKind::Number, json!(4.0), "Narrow-end X extent in mm"),
                    doc_param(),
                ],
                placement_params(),
            ]
            .concat(),
            template: create_wedge,
        },
        ToolDescriptor {
            name: "create_helix",
            description: "Create a parametric helix (Part::Helix).",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::with_default("name", ParamKind::Str, json!("Helix"), "Object name"),
                ParamSpec::with_default("pitch", ParamKind::Number, json!(1.0), "Pitch in mm"),
                ParamSpec::with_default("height", ParamKind::Number, json!(10.0), "Height in mm"),
                ParamSpec::with_default("radius", ParamKind::Number, json!(5.0), "Radius in mm"),
                ParamSpec::with_default("angle", ParamKind::Number, json!(0.0), "Cone half-angle in degrees"),
                doc_param(),
            ],
            template: create_helix,
        },
    ]
}

/// Shared tail: apply placement, recompute, report.
fn feature_tail(params: &ParamValues) -> String {
    format!(
        r#"    obj.Placement.Base = FreeCAD.Vector({x}, {y}, {z})
    doc.recompute()
    _result_ = {{"success": True, "name": obj.Name, "label": obj.Label, "type_id": obj.TypeId}}
"#,
        x = params.f64("x"),
        y = params.f64("y"),
        z = params.f64("z"),
    )
}

fn create_box(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.addObject("Part::Box", {name})
    obj.Length = {length}
    obj.Width = {width}
    obj.Height = {height}
{tail}"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        name = params.py("name"),
        length = params.f64("length"),
        width = params.f64("width"),
        height = params.f64("height"),
        tail = feature_tail(params),
    )
}

fn create_cylinder(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.addObject("Part::Cylinder", {name})
    obj.Radius = {radius}
    obj.Height = {height}
    obj.Angle = {angle}
{tail}"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        name = params.py("name"),
        radius = params.f64("radius"),
        height = params.f64("height"),
        angle = params.f64("angle"),
        tail = feature_tail(params),
    )
}

fn create_sphere(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.addObject("Part::Sphere", {name})
    obj.Radius = {radius}
{tail}"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        name = params.py("name"),
        radius = params.f64("radius"),
        tail = feature_tail(params),
    )
}

fn create_cone(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.addObject("Part::Cone", {name})
    obj.Radius1 = {radius1}
    obj.Radius2 = {radius2}
    obj.Height = {height}
{tail}"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        name = params.py("name"),
        radius1 = params.f64("radius1"),
        radius2 = params.f64("radius2"),
        height = params.f64("height"),
        tail = feature_tail(params),
    )
}

fn create_torus(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.addObject("Part::Torus", {name})
    obj.Radius1 = {radius1}
    obj.Radius2 = {radius2}
{tail}"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        name = params.py("name"),
        radius1 = params.f64("radius1"),
        radius2 = params.f64("radius2"),
        tail = feature_tail(params),
    )
}

fn create_wedge(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.addObject("Part::Wedge", {name})
    obj.Xmax = {xmax}
    obj.Ymax = {ymax}
    obj.Zmax = {zmax}
    obj.X2max = {x2max}
{tail}"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        name = params.py("name"),
        xmax = params.f64("xmax"),
        ymax = params.f64("ymax"),
        zmax = params.f64("zmax"),
        x2max = params.f64("x2max"),
        tail = feature_tail(params),
    )
}

fn create_helix(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.addObject("Part::Helix", {name})
    obj.Pitch = {pitch}
    obj.Height = {height}
    obj.Radius = {radius}
    obj.Angle = {angle}
    doc.recompute()
    _result_ = {{"success": True, "name": obj.Name, "label": obj.Label, "type_id": obj.TypeId}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        name = params.py("name"),
        pitch = params.f64("pitch"),
        height = params.f64("height"),
        radius = params.f64("radius"),
        angle = params.f64("angle"),
    )
}
