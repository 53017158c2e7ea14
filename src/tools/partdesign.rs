//! Sketcher and PartDesign workflow tools.

use serde_json::json;

use super::{ParamKind, ParamSpec, ParamValues, ToolDescriptor};
use crate::script::resolve_document;

const CATEGORY: &str = "partdesign";

fn doc_param() -> ParamSpec {
    ParamSpec::optional(
        "doc_name",
        ParamKind::Str,
        "Target document; active document if omitted",
    )
}

fn sketch_param() -> ParamSpec {
    ParamSpec::required("sketch", ParamKind::Str, "Sketch object name")
}

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "create_partdesign_body",
            description: "Create a PartDesign Body to hold a feature tree.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::with_default("name", ParamKind::Str, json!("Body"), "Body name"),
                doc_param(),
            ],
            template: create_body,
        },
        ToolDescriptor {
            name: "create_sketch",
            description: "Create a sketch on a base plane (XY, XZ or YZ), inside a body if given.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::with_default("name", ParamKind::Str, json!("Sketch"), "Sketch name"),
                ParamSpec::with_default("plane", ParamKind::Str, json!("XY"), "Base plane: XY, XZ or YZ"),
                ParamSpec::optional("body", ParamKind::Str, "Body to attach the sketch to"),
                doc_param(),
            ],
            template: create_sketch,
        },
        ToolDescriptor {
            name: "add_sketch_line",
            description: "Add a line segment to a sketch.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                sketch_param(),
                ParamSpec::required("x1", ParamKind::Number, "Start X"),
                ParamSpec::required("y1", ParamKind::Number, "Start Y"),
                ParamSpec::required("x2", ParamKind::Number, "End X"),
                ParamSpec::required("y2", ParamKind::Number, "End Y"),
                doc_param(),
            ],
            template: add_sketch_line,
        },
        ToolDescriptor {
            name: "add_sketch_circle",
            description: "Add a circle to a sketch.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                sketch_param(),
                ParamSpec::with_default("cx", ParamKind::Number, json!(0.0), "Center X"),
                ParamSpec::with_default("cy", ParamKind::Number, json!(0.0), "Center Y"),
                ParamSpec::required("radius", ParamKind::Number, "Radius in mm"),
                doc_param(),
            ],
            template: add_sketch_circle,
        },
        ToolDescriptor {
            name: "add_sketch_arc",
            description: "Add a circular arc to a sketch (angles in degrees).",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                sketch_param(),
                ParamSpec::with_default("cx", ParamKind::Number, json!(0.0), "Center X"),
                ParamSpec::with_default("cy", ParamKind::Number, json!(0.0), "Center Y"),
                ParamSpec::required("radius", ParamKind::Number, "Radius in mm"),
                ParamSpec::required("start_angle", ParamKind::Number, "Start angle in degrees"),
                ParamSpec::required("end_angle", ParamKind::Number, "End angle in degrees"),
                doc_param(),
            ],
            template: add_sketch_arc,
        },
        ToolDescriptor {
            name: "add_sketch_point",
            description: "Add a point to a sketch, e.g. as a hole center or reference location.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                sketch_param(),
                ParamSpec::required("x", ParamKind::Number, "X coordinate"),
                ParamSpec::required("y", ParamKind::Number, "Y coordinate"),
                doc_param(),
            ],
            template: add_sketch_point,
        },
        ToolDescriptor {
            name: "add_sketch_rectangle",
            description: "Add an axis-aligned rectangle (four lines with coincident constraints).",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                sketch_param(),
                ParamSpec::required("x", ParamKind::Number, "Corner X"),
                ParamSpec::required("y", ParamKind::Number, "Corner Y"),
                ParamSpec::required("width", ParamKind::Number, "Width in mm"),
                ParamSpec::required("height", ParamKind::Number, "Height in mm"),
                doc_param(),
            ],
            template: add_sketch_rectangle,
        },
        ToolDescriptor {
            name: "pad_sketch",
            description: "Pad (extrude) a sketch into a solid.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                sketch_param(),
                ParamSpec::with_default("length", ParamKind::Number, json!(10.0), "Pad length in mm"),
                ParamSpec::with_default("reversed", ParamKind::Bool, json!(false), "Pad in the opposite direction"),
                ParamSpec::optional("name", ParamKind::Str, "Feature name"),
                doc_param(),
            ],
            template: pad_sketch,
        },
        ToolDescriptor {
            name: "pocket_sketch",
            description: "Pocket (cut) a sketch into the body it belongs to.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                sketch_param(),
                ParamSpec::with_default("length", ParamKind::Number, json!(10.0), "Pocket depth in mm"),
                ParamSpec::with_default("through_all", ParamKind::Bool, json!(false), "Cut through the whole solid"),
                ParamSpec::optional("name", ParamKind::Str, "Feature name"),
                doc_param(),
            ],
            template: pocket_sketch,
        },
        ToolDescriptor {
            name: "revolution_sketch",
            description: "Revolve a sketch around an axis to create a solid.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                sketch_param(),
                ParamSpec::with_default("angle", ParamKind::Number, json!(360.0), "Revolution angle in degrees"),
                ParamSpec::with_default("axis", ParamKind::Str, json!("V_Axis"), "Sketch axis: V_Axis or H_Axis"),
                ParamSpec::optional("name", ParamKind::Str, "Feature name"),
                doc_param(),
            ],
            template: revolution_sketch,
        },
        ToolDescriptor {
            name: "groove_sketch",
            description: "Create a Groove (subtractive revolution) from a sketch inside a body.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                sketch_param(),
                ParamSpec::with_default("angle", ParamKind::Number, json!(360.0), "Groove angle in degrees"),
                ParamSpec::with_default("axis", ParamKind::Str, json!("Base_X"), "Base_X, Base_Y, Base_Z, Sketch_V or Sketch_H"),
                ParamSpec::with_default("symmetric", ParamKind::Bool, json!(false), "Revolve symmetrically"),
                ParamSpec::with_default("reversed", ParamKind::Bool, json!(false), "Reverse direction"),
                ParamSpec::optional("name", ParamKind::Str, "Feature name"),
                doc_param(),
            ],
            template: groove_sketch,
        },
        ToolDescriptor {
            name: "loft_sketches",
            description: "Loft through an ordered list of sketch profiles.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("sketches", ParamKind::List, "Sketch names, in loft order"),
                ParamSpec::with_default("solid", ParamKind::Bool, json!(true), "Create a solid"),
                ParamSpec::with_default("ruled", ParamKind::Bool, json!(false), "Use ruled surfaces"),
                ParamSpec::optional("name", ParamKind::Str, "Feature name"),
                doc_param(),
            ],
            template: loft_sketches,
        },
        ToolDescriptor {
            name: "sweep_sketch",
            description: "Sweep a profile sketch along a path sketch.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("profile", ParamKind::Str, "Profile sketch name"),
                ParamSpec::required("path", ParamKind::Str, "Path sketch name"),
                ParamSpec::with_default("solid", ParamKind::Bool, json!(true), "Create a solid"),
                ParamSpec::optional("name", ParamKind::Str, "Feature name"),
                doc_param(),
            ],
            template: sweep_sketch,
        },
        ToolDescriptor {
            name: "fillet_edges",
            description: "Fillet edges of a shape. Fillets all edges unless indices are given.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("object", ParamKind::Str, "Object to fillet"),
                ParamSpec::required("radius", ParamKind::Number, "Fillet radius in mm"),
                ParamSpec::optional("edges", ParamKind::List, "1-based edge indices; all edges if omitted"),
                doc_param(),
            ],
            template: fillet_edges,
        },
        ToolDescriptor {
            name: "chamfer_edges",
            description: "Chamfer edges of a shape. Chamfers all edges unless indices are given.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("object", ParamKind::Str, "Object to chamfer"),
                ParamSpec::required("size", ParamKind::Number, "Chamfer size in mm"),
                ParamSpec::optional("edges", ParamKind::List, "1-based edge indices; all edges if omitted"),
                doc_param(),
            ],
            template: chamfer_edges,
        },
        ToolDescriptor {
            name: "linear_pattern",
            description: "Repeat an object along a direction vector.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("object", ParamKind::Str, "Object to pattern"),
                ParamSpec::required("count", ParamKind::Int, "Total number of occurrences"),
                ParamSpec::with_default("dx", ParamKind::Number, json!(10.0), "Step X in mm"),
                ParamSpec::with_default("dy", ParamKind::Number, json!(0.0), "Step Y in mm"),
                ParamSpec::with_default("dz", ParamKind::Number, json!(0.0), "Step Z in mm"),
                doc_param(),
            ],
            template: linear_pattern,
        },
        ToolDescriptor {
            name: "polar_pattern",
            description: "Repeat an object around the Z axis.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("object", ParamKind::Str, "Object to pattern"),
                ParamSpec::required("count", ParamKind::Int, "Total number of occurrences"),
                ParamSpec::with_default("angle", ParamKind::Number, json!(360.0), "Total sweep angle in degrees"),
                doc_param(),
            ],
            template: polar_pattern,
        },
        ToolDescriptor {
            name: "mirrored_feature",
            description: "Mirror a PartDesign feature across a base plane of its body.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("feature", ParamKind::Str, "Feature to mirror"),
                ParamSpec::required("body", ParamKind::Str, "Body containing the feature"),
                ParamSpec::with_default("plane", ParamKind::Str, json!("XY"), "Mirror plane: XY, XZ or YZ"),
                doc_param(),
            ],
            template: mirrored_feature,
        },
        ToolDescriptor {
            name: "create_hole",
            description: "Cut a cylindrical hole into an object at a position.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("object", ParamKind::Str, "Object to drill"),
                ParamSpec::required("diameter", ParamKind::Number, "Hole diameter in mm"),
                ParamSpec::with_default("depth", ParamKind::Number, json!(10.0), "Hole depth in mm"),
                ParamSpec::with_default("x", ParamKind::Number, json!(0.0), "Hole center X"),
                ParamSpec::with_default("y", ParamKind::Number, json!(0.0), "Hole center Y"),
                ParamSpec::with_default("z", ParamKind::Number, json!(0.0), "Hole top Z"),
                doc_param(),
            ],
            template: create_hole,
        },
    ]
}

/// Resolve document plus a named sketch object.
fn resolve_sketch(doc_name: Option<&str>, sketch_literal: &str) -> String {
    format!(
        r#"{resolve}sketch = None
if doc is not None:
    sketch = doc.getObject({sketch})
    if sketch is None:
        _result_ = {{"success": False, "error": "Sketch not found: %s" % {sketch}}}
"#,
        resolve = resolve_document(doc_name),
        sketch = sketch_literal,
    )
}

fn create_body(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    body = doc.addObject("PartDesign::Body", {name})
    doc.recompute()
    _result_ = {{"success": True, "name": body.Name, "label": body.Label}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        name = params.py("name"),
    )
}

fn create_sketch(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    plane = {plane}
    plane_map = {{"XY": "XY_Plane", "XZ": "XZ_Plane", "YZ": "YZ_Plane"}}
    if plane not in plane_map:
        _result_ = {{"success": False, "error": "Unknown plane: %s" % plane}}
    else:
        body_name = {body}
        body = doc.getObject(body_name) if body_name else None
        if body is not None:
            sketch = body.newObject("Sketcher::SketchObject", {name})
            plane_ref = body.Origin.OriginFeatures[["XY_Plane", "XZ_Plane", "YZ_Plane"].index(plane_map[plane])]
            sketch.AttachmentSupport = [(plane_ref, "")]
            sketch.MapMode = "FlatFace"
        else:
            sketch = doc.addObject("Sketcher::SketchObject", {name})
            import math
            if plane == "XZ":
                sketch.Placement = FreeCAD.Placement(FreeCAD.Vector(0, 0, 0), FreeCAD.Rotation(FreeCAD.Vector(1, 0, 0), 90))
            elif plane == "YZ":
                sketch.Placement = FreeCAD.Placement(FreeCAD.Vector(0, 0, 0), FreeCAD.Rotation(FreeCAD.Vector(0, 1, 0), 90))
        doc.recompute()
        _result_ = {{"success": True, "name": sketch.Name, "plane": plane}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        plane = params.py("plane"),
        body = params.py("body"),
        name = params.py("name"),
    )
}

fn add_sketch_line(params: &ParamValues) -> String {
    format!(
        r#"import Part
{resolve}if sketch is not None:
    index = sketch.addGeometry(Part.LineSegment(
        FreeCAD.Vector({x1}, {y1}, 0), FreeCAD.Vector({x2}, {y2}, 0)), False)
    doc.recompute()
    _result_ = {{"success": True, "sketch": sketch.Name, "geometry_index": index}}
"#,
        resolve = resolve_sketch(params.opt_str("doc_name"), &params.py("sketch")),
        x1 = params.f64("x1"),
        y1 = params.f64("y1"),
        x2 = params.f64("x2"),
        y2 = params.f64("y2"),
    )
}

fn add_sketch_circle(params: &ParamValues) -> String {
    format!(
        r#"import Part
{resolve}if sketch is not None:
    index = sketch.addGeometry(Part.Circle(
        FreeCAD.Vector({cx}, {cy}, 0), FreeCAD.Vector(0, 0, 1), {radius}), False)
    doc.recompute()
    _result_ = {{"success": True, "sketch": sketch.Name, "geometry_index": index}}
"#,
        resolve = resolve_sketch(params.opt_str("doc_name"), &params.py("sketch")),
        cx = params.f64("cx"),
        cy = params.f64("cy"),
        radius = params.f64("radius"),
    )
}

fn add_sketch_arc(params: &ParamValues) -> String {
    format!(
        r#"import Part
import math
{resolve}if sketch is not None:
    circle = Part.Circle(FreeCAD.Vector({cx}, {cy}, 0), FreeCAD.Vector(0, 0, 1), {radius})
    index = sketch.addGeometry(Part.ArcOfCircle(
        circle, math.radians({start}), math.radians({end})), False)
    doc.recompute()
    _result_ = {{"success": True, "sketch": sketch.Name, "geometry_index": index}}
"#,
        resolve = resolve_sketch(params.opt_str("doc_name"), &params.py("sketch")),
        cx = params.f64("cx"),
        cy = params.f64("cy"),
        radius = params.f64("radius"),
        start = params.f64("start_angle"),
        end = params.f64("end_angle"),
    )
}

fn add_sketch_point(params: &ParamValues) -> String {
    format!(
        r#"import Part
{resolve}if sketch is not None:
    index = sketch.addGeometry(Part.Point(FreeCAD.Vector({x}, {y}, 0)), False)
    doc.recompute()
    _result_ = {{
        "success": True,
        "sketch": sketch.Name,
        "geometry_index": index,
        "geometry_count": sketch.GeometryCount,
    }}
"#,
        resolve = resolve_sketch(params.opt_str("doc_name"), &params.py("sketch")),
        x = params.f64("x"),
        y = params.f64("y"),
    )
}

fn add_sketch_rectangle(params: &ParamValues) -> String {
    format!(
        r#"import Part
import Sketcher
{resolve}if sketch is not None:
    x, y, w, h = {x}, {y}, {w}, {h}
    points = [
        (FreeCAD.Vector(x, y, 0), FreeCAD.Vector(x + w, y, 0)),
        (FreeCAD.Vector(x + w, y, 0), FreeCAD.Vector(x + w, y + h, 0)),
        (FreeCAD.Vector(x + w, y + h, 0), FreeCAD.Vector(x, y + h, 0)),
        (FreeCAD.Vector(x, y + h, 0), FreeCAD.Vector(x, y, 0)),
    ]
    first = None
    for start, end in points:
        idx = sketch.addGeometry(Part.LineSegment(start, end), False)
        if first is None:
            first = idx
    for i in range(4):
        a = first + i
        b = first + (i + 1) % 4
        sketch.addConstraint(Sketcher.Constraint("Coincident", a, 2, b, 1))
    doc.recompute()
    _result_ = {{"success": True, "sketch": sketch.Name, "first_index": first}}
"#,
        resolve = resolve_sketch(params.opt_str("doc_name"), &params.py("sketch")),
        x = params.f64("x"),
        y = params.f64("y"),
        w = params.f64("width"),
        h = params.f64("height"),
    )
}

/// Shared shape for Pad/Pocket/Revolution: find the owning body, add the
/// feature, recompute, report.
fn sketch_feature(
    params: &ParamValues,
    feature_type: &str,
    default_name: &str,
    setup: &str,
) -> String {
    format!(
        r#"{resolve}if sketch is not None:
    body = sketch.getParentGroup()
    if body is not None and body.TypeId == "PartDesign::Body":
        feature = body.newObject({feature_type}, {name} or {default_name})
    else:
        feature = doc.addObject({feature_type}, {name} or {default_name})
    feature.Profile = sketch
{setup}    sketch.Visibility = False
    doc.recompute()
    if feature.isValid() if hasattr(feature, "isValid") else True:
        _result_ = {{"success": True, "name": feature.Name, "type_id": feature.TypeId}}
    else:
        _result_ = {{"success": False, "error": "Feature failed to compute: %s" % feature.Name}}
"#,
        resolve = resolve_sketch(params.opt_str("doc_name"), &params.py("sketch")),
        feature_type = crate::script::py_str(feature_type),
        name = params.py("name"),
        default_name = crate::script::py_str(default_name),
        setup = setup,
    )
}

fn pad_sketch(params: &ParamValues) -> String {
    let setup = format!(
        "    feature.Length = {}\n    feature.Reversed = {}\n",
        params.f64("length"),
        if params.bool("reversed") { "True" } else { "False" },
    );
    sketch_feature(params, "PartDesign::Pad", "Pad", &setup)
}

fn pocket_sketch(params: &ParamValues) -> String {
    let setup = if params.bool("through_all") {
        "    feature.Type = 1\n".to_string()
    } else {
        format!("    feature.Length = {}\n", params.f64("length"))
    };
    sketch_feature(params, "PartDesign::Pocket", "Pocket", &setup)
}

fn revolution_sketch(params: &ParamValues) -> String {
    let setup = format!(
        "    feature.Angle = {}\n    feature.ReferenceAxis = (sketch, [{}])\n",
        params.f64("angle"),
        crate::script::py_str(params.opt_str("axis").unwrap_or("V_Axis")),
    );
    sketch_feature(params, "PartDesign::Revolution", "Revolution", &setup)
}

fn groove_sketch(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if sketch is not None:
    body = sketch.getParentGroup()
    if body is None or body.TypeId != "PartDesign::Body":
        _result_ = {{"success": False, "error": "Sketch must be inside a PartDesign Body for Groove"}}
    else:
        groove = body.newObject("PartDesign::Groove", {name} or "Groove")
        groove.Profile = sketch
        groove.Angle = {angle}
        groove.Symmetric = {symmetric}
        groove.Reversed = {reversed}
        axis_name = {axis}
        if axis_name.startswith("Base_"):
            axis_ref = axis_name.replace("Base_", "")
            groove.ReferenceAxis = (body.Origin.getObject("%s_Axis" % axis_ref), [""])
        elif axis_name == "Sketch_V":
            groove.ReferenceAxis = (sketch, ["V_Axis"])
        else:
            groove.ReferenceAxis = (sketch, ["H_Axis"])
        sketch.Visibility = False
        doc.recompute()
        _result_ = {{"success": True, "name": groove.Name, "type_id": groove.TypeId}}
"#,
        resolve = resolve_sketch(params.opt_str("doc_name"), &params.py("sketch")),
        name = params.py("name"),
        angle = params.f64("angle"),
        symmetric = if params.bool("symmetric") { "True" } else { "False" },
        reversed = if params.bool("reversed") { "True" } else { "False" },
        axis = params.py("axis"),
    )
}

fn loft_sketches(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    names = {names}
    profiles = []
    missing = [n for n in names if doc.getObject(n) is None]
    if len(names) < 2:
        _result_ = {{"success": False, "error": "Loft needs at least two sketches"}}
    elif missing:
        _result_ = {{"success": False, "error": "Sketches not found: %s" % ", ".join(missing)}}
    else:
        import Part
        shapes = [doc.getObject(n).Shape for n in names]
        wires = [s.Wires[0] for s in shapes]
        loft = Part.makeLoft(wires, {solid}, {ruled})
        obj = doc.addObject("Part::Feature", {name} or "Loft")
        obj.Shape = loft
        doc.recompute()
        _result_ = {{"success": True, "name": obj.Name, "profiles": names}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        names = params.py("sketches"),
        solid = if params.bool("solid") { "True" } else { "False" },
        ruled = if params.bool("ruled") { "True" } else { "False" },
        name = params.py("name"),
    )
}

fn sweep_sketch(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    profile = doc.getObject({profile})
    path = doc.getObject({path})
    if profile is None or path is None:
        _result_ = {{"success": False, "error": "Profile or path sketch not found"}}
    else:
        obj = doc.addObject("Part::Sweep", {name} or "Sweep")
        obj.Sections = [profile]
        obj.Spine = path
        obj.Solid = {solid}
        obj.Frenet = False
        doc.recompute()
        _result_ = {{"success": True, "name": obj.Name}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        profile = params.py("profile"),
        path = params.py("path"),
        name = params.py("name"),
        solid = if params.bool("solid") { "True" } else { "False" },
    )
}

fn edge_feature(params: &ParamValues, type_id: &str, prop: &str, value: f64) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.getObject({object})
    if obj is None:
        _result_ = {{"success": False, "error": "Object not found: %s" % {object}}}
    elif not hasattr(obj, "Shape"):
        _result_ = {{"success": False, "error": "Object has no shape: %s" % {object}}}
    else:
        indices = {edges} or list(range(1, len(obj.Shape.Edges) + 1))
        feature = doc.addObject({type_id}, obj.Name + "_{suffix}")
        feature.Base = obj
        feature.Edges = [(i, {value}, {value}) for i in indices]
        obj.Visibility = False
        doc.recompute()
        if feature.Shape.isNull():
            _result_ = {{"success": False, "error": "{suffix} failed; check radius against edge lengths"}}
        else:
            _result_ = {{"success": True, "name": feature.Name, "edge_count": len(indices)}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        object = params.py("object"),
        edges = params.py("edges"),
        type_id = crate::script::py_str(type_id),
        suffix = prop,
        value = value,
    )
}

fn fillet_edges(params: &ParamValues) -> String {
    edge_feature(params, "Part::Fillet", "Fillet", params.f64("radius"))
}

fn chamfer_edges(params: &ParamValues) -> String {
    edge_feature(params, "Part::Chamfer", "Chamfer", params.f64("size"))
}

fn linear_pattern(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.getObject({object})
    if obj is None:
        _result_ = {{"success": False, "error": "Object not found: %s" % {object}}}
    elif {count} < 2:
        _result_ = {{"success": False, "error": "Pattern count must be at least 2"}}
    else:
        import Part
        shapes = [obj.Shape]
        for i in range(1, {count}):
            copy = obj.Shape.copy()
            copy.translate(FreeCAD.Vector({dx} * i, {dy} * i, {dz} * i))
            shapes.append(copy)
        compound = Part.makeCompound(shapes)
        result = doc.addObject("Part::Feature", obj.Name + "_array")
        result.Shape = compound
        obj.Visibility = False
        doc.recompute()
        _result_ = {{"success": True, "name": result.Name, "count": {count}}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        object = params.py("object"),
        count = params.i64("count"),
        dx = params.f64("dx"),
        dy = params.f64("dy"),
        dz = params.f64("dz"),
    )
}

fn polar_pattern(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.getObject({object})
    if obj is None:
        _result_ = {{"success": False, "error": "Object not found: %s" % {object}}}
    elif {count} < 2:
        _result_ = {{"success": False, "error": "Pattern count must be at least 2"}}
    else:
        import Part
        total = {angle}
        step = total / {count} if total >= 360.0 else total / ({count} - 1)
        shapes = []
        for i in range({count}):
            copy = obj.Shape.copy()
            copy.rotate(FreeCAD.Vector(0, 0, 0), FreeCAD.Vector(0, 0, 1), step * i)
            shapes.append(copy)
        compound = Part.makeCompound(shapes)
        result = doc.addObject("Part::Feature", obj.Name + "_polar")
        result.Shape = compound
        obj.Visibility = False
        doc.recompute()
        _result_ = {{"success": True, "name": result.Name, "count": {count}}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        object = params.py("object"),
        count = params.i64("count"),
        angle = params.f64("angle"),
    )
}

fn mirrored_feature(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    body = doc.getObject({body})
    feature = doc.getObject({feature})
    if body is None or feature is None:
        _result_ = {{"success": False, "error": "Body or feature not found"}}
    else:
        plane_map = {{"XY": "XY_Plane", "XZ": "XZ_Plane", "YZ": "YZ_Plane"}}
        plane = plane_map.get({plane})
        if plane is None:
            _result_ = {{"success": False, "error": "Unknown plane: %s" % {plane}}}
        else:
            mirrored = body.newObject("PartDesign::Mirrored", feature.Name + "_mirrored")
            mirrored.Originals = [feature]
            plane_ref = body.Origin.OriginFeatures[["XY_Plane", "XZ_Plane", "YZ_Plane"].index(plane)]
            mirrored.MirrorPlane = (plane_ref, [""])
            doc.recompute()
            _result_ = {{"success": True, "name": mirrored.Name}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        body = params.py("body"),
        feature = params.py("feature"),
        plane = params.py("plane"),
    )
}

fn create_hole(params: &ParamValues) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.getObject({object})
    if obj is None:
        _result_ = {{"success": False, "error": "Object not found: %s" % {object}}}
    else:
        import Part
        radius = {diameter} / 2.0
        drill = Part.makeCylinder(radius, {depth}, FreeCAD.Vector({x}, {y}, {z} - {depth}), FreeCAD.Vector(0, 0, 1))
        cut = obj.Shape.cut(drill)
        result = doc.addObject("Part::Feature", obj.Name + "_drilled")
        result.Shape = cut
        obj.Visibility = False
        doc.recompute()
        _result_ = {{"success": True, "name": result.Name, "diameter": {diameter}}}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        object = params.py("object"),
        diameter = params.f64("diameter"),
        depth = params.f64("depth"),
        x = params.f64("x"),
        y = params.f64("y"),
        z = params.f64("z"),
    )
}
