//! Import/export tools for the common exchange formats.

use serde_json::json;

use super::{ParamKind, ParamSpec, ParamValues, ToolDescriptor};
use crate::script::resolve_document;

const CATEGORY: &str = "export";

fn doc_param() -> ParamSpec {
    ParamSpec::optional(
        "doc_name",
        ParamKind::Str,
        "Source document; active document if omitted",
    )
}

fn path_param() -> ParamSpec {
    ParamSpec::required("path", ParamKind::Str, "Output file path")
}

fn objects_param() -> ParamSpec {
    ParamSpec::optional(
        "objects",
        ParamKind::List,
        "Object names to export; all visible objects if omitted",
    )
}

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "export_step",
            description: "Export objects to a STEP file.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![path_param(), objects_param(), doc_param()],
            template: export_step,
        },
        ToolDescriptor {
            name: "export_iges",
            description: "Export objects to an IGES file.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![path_param(), objects_param(), doc_param()],
            template: export_iges,
        },
        ToolDescriptor {
            name: "export_stl",
            description: "Export objects to an STL mesh file.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                path_param(),
                objects_param(),
                ParamSpec::with_default(
                    "linear_deflection",
                    ParamKind::Number,
                    json!(0.1),
                    "Mesh tessellation tolerance in mm",
                ),
                doc_param(),
            ],
            template: export_stl,
        },
        ToolDescriptor {
            name: "export_obj",
            description: "Export objects to a Wavefront OBJ file.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![path_param(), objects_param(), doc_param()],
            template: export_obj,
        },
        ToolDescriptor {
            name: "export_3mf",
            description: "Export objects to a 3MF file.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![path_param(), objects_param(), doc_param()],
            template: export_3mf,
        },
        ToolDescriptor {
            name: "import_step",
            description: "Import a STEP file into a document.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("path", ParamKind::Str, "STEP file path"),
                doc_param(),
            ],
            template: import_step,
        },
        ToolDescriptor {
            name: "import_stl",
            description: "Import an STL mesh file into a document.",
            category: CATEGORY,
            requires_ui: false,
            params: vec![
                ParamSpec::required("path", ParamKind::Str, "STL file path"),
                doc_param(),
            ],
            template: import_stl,
        },
    ]
}

/// Collect the export set: named objects (failing on unknowns) or every
/// visible object with a shape.
fn collect_objects(params: &ParamValues) -> String {
    format!(
        r#"    names = {names}
    if names:
        objects = []
        missing = []
        for n in names:
            o = doc.getObject(n)
            if o is None:
                missing.append(n)
            else:
                objects.append(o)
        if missing:
            objects = None
            _result_ = {{"success": False, "error": "Objects not found: %s" % ", ".join(missing)}}
    else:
        objects = [o for o in doc.Objects if hasattr(o, "Shape")]
        if not objects:
            objects = None
            _result_ = {{"success": False, "error": "Nothing to export"}}
"#,
        names = params.py("objects"),
    )
}

fn shape_export(params: &ParamValues, module: &str, format_name: &str) -> String {
    format!(
        r#"import {module}
import os
{resolve}if doc is not None:
{collect}    if objects is not None:
        path = {path}
        {module}.export(objects, path)
        _result_ = {{
            "success": True,
            "path": path,
            "format": "{format_name}",
            "objects": [o.Name for o in objects],
            "size_bytes": os.path.getsize(path) if os.path.exists(path) else 0,
        }}
"#,
        module = module,
        resolve = resolve_document(params.opt_str("doc_name")),
        collect = collect_objects(params),
        path = crate::script::py_str(params.str("path")),
        format_name = format_name,
    )
}

fn export_step(params: &ParamValues) -> String {
    shape_export(params, "Import", "step")
}

fn export_iges(params: &ParamValues) -> String {
    shape_export(params, "Import", "iges")
}

fn export_obj(params: &ParamValues) -> String {
    shape_export(params, "Mesh", "obj")
}

fn export_3mf(params: &ParamValues) -> String {
    shape_export(params, "Mesh", "3mf")
}

fn export_stl(params: &ParamValues) -> String {
    format!(
        r#"import Mesh
import MeshPart
import os
{resolve}if doc is not None:
{collect}    if objects is not None:
        path = {path}
        mesh = Mesh.Mesh()
        for o in objects:
            if hasattr(o, "Shape"):
                part = MeshPart.meshFromShape(Shape=o.Shape, LinearDeflection={deflection})
                mesh.addMesh(part)
        mesh.write(path)
        _result_ = {{
            "success": True,
            "path": path,
            "format": "stl",
            "objects": [o.Name for o in objects],
            "facets": mesh.CountFacets,
            "size_bytes": os.path.getsize(path) if os.path.exists(path) else 0,
        }}
"#,
        resolve = resolve_document(params.opt_str("doc_name")),
        collect = collect_objects(params),
        path = crate::script::py_str(params.str("path")),
        deflection = params.f64("linear_deflection"),
    )
}

fn import_file(params: &ParamValues, module: &str, format_name: &str) -> String {
    format!(
        r#"import {module}
import os
{resolve}if doc is not None:
    path = {path}
    if not os.path.exists(path):
        _result_ = {{"success": False, "error": "File not found: %s" % path}}
    else:
        before = set(o.Name for o in doc.Objects)
        {module}.insert(path, doc.Name)
        doc.recompute()
        added = [o.Name for o in doc.Objects if o.Name not in before]
        _result_ = {{
            "success": True,
            "path": path,
            "format": "{format_name}",
            "imported_objects": added,
        }}
"#,
        module = module,
        resolve = resolve_document(params.opt_str("doc_name")),
        path = crate::script::py_str(params.str("path")),
        format_name = format_name,
    )
}

fn import_step(params: &ParamValues) -> String {
    import_file(params, "Import", "step")
}

fn import_stl(params: &ParamValues) -> String {
    import_file(params, "Mesh", "stl")
}
