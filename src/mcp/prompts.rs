//! MCP prompt templates: guidance for AI assistants driving FreeCAD.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt argument definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// A prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A prompt message (the actual content).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: PromptContent,
}

/// Prompt content types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptContent {
    Text { text: String },
}

/// Result of prompts/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
}

/// Result of prompts/get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Prompt registry with `{{placeholder}}` substitution.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    prompts: HashMap<String, (Prompt, String)>,
}

impl PromptRegistry {
    /// Create a new registry with the built-in prompts.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_builtin_prompts();
        registry
    }

    pub fn register(&mut self, prompt: Prompt, template: impl Into<String>) {
        self.prompts
            .insert(prompt.name.clone(), (prompt, template.into()));
    }

    /// List prompts, sorted by name.
    pub fn list(&self) -> Vec<Prompt> {
        let mut prompts: Vec<Prompt> =
            self.prompts.values().map(|(p, _)| p.clone()).collect();
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        prompts
    }

    /// Render a prompt with the given arguments.
    pub fn get(&self, name: &str, args: &HashMap<String, String>) -> Option<GetPromptResult> {
        let (prompt, template) = self.prompts.get(name)?;

        let mut text = template.clone();
        for argument in &prompt.arguments {
            let value = args.get(&argument.name).cloned().unwrap_or_default();
            text = text.replace(&format!("{{{{{}}}}}", argument.name), &value);
        }

        Some(GetPromptResult {
            description: Some(prompt.description.clone()),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: PromptContent::Text { text },
            }],
        })
    }

    pub fn count(&self) -> usize {
        self.prompts.len()
    }

    fn register_builtin_prompts(&mut self) {
        self.register(
            Prompt {
                name: "design_part".to_string(),
                description: "Guide for designing a part from a description".to_string(),
                arguments: vec![PromptArgument {
                    name: "description".to_string(),
                    description: "What the part should be".to_string(),
                    required: true,
                }],
            },
            r#"Design the following part in FreeCAD: {{description}}

Work incrementally:
1. Create a document with `create_document`.
2. Build base solids with the primitive tools (`create_box`, `create_cylinder`, ...)
   or a sketch plus `pad_sketch` for custom profiles.
3. Combine solids with `boolean_operation` (union, cut, intersection).
4. Add finishing touches with `fillet_edges` / `chamfer_edges`.
5. Verify each step with `list_objects` and `inspect_object` - check
   `shape_info.is_valid` and `volume` after every boolean.
6. If the GUI is up, confirm visually with `get_screenshot`.

Dimensions are millimeters. Prefer parametric features over raw
`execute_python` so the model stays editable."#,
        );

        self.register(
            Prompt {
                name: "sketch_workflow".to_string(),
                description: "Guide for sketch-based parametric modeling".to_string(),
                arguments: vec![],
            },
            r#"Sketch-based workflow in FreeCAD:

1. `create_partdesign_body` - features need a body to live in.
2. `create_sketch` on XY, XZ or YZ (pass the body name).
3. Draw geometry: `add_sketch_line`, `add_sketch_circle`, `add_sketch_arc`,
   `add_sketch_rectangle`. Closed profiles are required for solids.
4. `pad_sketch` to extrude, `pocket_sketch` to cut, `revolution_sketch`
   to revolve around a sketch axis.
5. Repeat features with `linear_pattern` / `polar_pattern` / `mirrored_feature`.

If a pad fails with an empty shape, the profile is probably open - check
with `inspect_object` on the sketch and close the loop."#,
        );

        self.register(
            Prompt {
                name: "export_guide".to_string(),
                description: "Choosing an export format".to_string(),
                arguments: vec![PromptArgument {
                    name: "target_format".to_string(),
                    description: "Desired output format".to_string(),
                    required: false,
                }],
            },
            r#"Export guidance (requested: {{target_format}}):

- STEP (`export_step`): lossless B-rep, the right choice for CAD interchange.
- IGES (`export_iges`): legacy B-rep, only when the consumer cannot read STEP.
- STL (`export_stl`): tessellated mesh for 3D printing; tune
  `linear_deflection` (smaller = finer, default 0.1 mm).
- OBJ (`export_obj`): mesh for rendering and game pipelines.
- 3MF (`export_3mf`): modern printing format with units and colors.

Always `recompute_document` before exporting, and check the returned
`size_bytes` - a suspiciously small file usually means empty geometry."#,
        );

        self.register(
            Prompt {
                name: "debug_model".to_string(),
                description: "Systematic debugging of a broken model".to_string(),
                arguments: vec![],
            },
            r#"Debugging a FreeCAD model:

1. `get_console_log` - recompute errors land in the report view.
2. `list_objects` - look for objects whose names end in a number you did
   not create; duplicated features usually mean a failed operation left
   remains behind.
3. `inspect_object` on each suspect - `shape_info.is_valid` false or
   `volume` 0 pinpoints the broken feature.
4. `get_undo_redo_status` then `undo` to step back past the breakage.
5. For boolean failures: check the two inputs actually overlap
   (compare placements), and that both are valid solids, not shells.
6. As a last resort, `execute_python` with
   `obj.Shape.check()` prints detailed geometry diagnostics."#,
        );

        self.register(
            Prompt {
                name: "python_api_primer".to_string(),
                description: "Primer on FreeCAD's Python API for execute_python".to_string(),
                arguments: vec![],
            },
            r#"FreeCAD Python quick reference for `execute_python`:

- `FreeCAD` (alias `App`): documents, units, placements.
  `FreeCAD.ActiveDocument`, `FreeCAD.newDocument(name)`,
  `doc.getObject(name)`, `doc.recompute()`.
- `FreeCADGui` (alias `Gui`): only when the GUI is up; guard with
  `FreeCAD.GuiUp`.
- `Part`: `Part.makeBox(l, w, h)`, `Part.makeCylinder(r, h)`,
  `shape.cut(other)`, `shape.fuse(other)`, `shape.common(other)`.
- Assign your answer to `_result_` as JSON-serializable data
  (dict/list/str/number/bool/None). Anything else is stringified.

Example:
    import Part
    box = Part.makeBox(10, 20, 30)
    _result_ = {"volume": box.Volume, "faces": len(box.Faces)}"#,
        );
    }
}
