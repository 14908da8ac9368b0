//! Texture workflow template and per-job materialization.
//!
//! The template is a ComfyUI API-format graph: a JSON object keyed by node
//! id, each node holding `class_type` and `inputs`. Materializing writes the
//! job's parameters and the active preset into fixed nodes and appends a
//! webhook node that reports the outputs back to us.

use std::path::Path;

use serde_json::{json, Value};
use texgen_core::preset::{ModelPreset, UpscalerSettings};
use texgen_core::types::DbId;

// ---------------------------------------------------------------------------
// Node ids
// ---------------------------------------------------------------------------

pub const NODE_MESH_LOADER: &str = "527";
pub const NODE_REFERENCE_IMAGE: &str = "381";
pub const NODE_SAMPLER: &str = "180";
pub const NODE_CHECKPOINT: &str = "183";
pub const NODE_STYLE_PROMPT: &str = "605";
pub const NODE_SUBJECT_PROMPT: &str = "606";
pub const NODE_UPSCALER_1: &str = "222";
pub const NODE_UPSCALER_2: &str = "227";
pub const NODE_WEBHOOK: &str = "999";

/// Output sockets wired into the webhook node, `(input name, source node)`.
const WEBHOOK_OUTPUTS: [(&str, &str); 4] = [
    ("diffuse", "104"),
    ("normal", "373"),
    ("height", "454"),
    ("thumbnail", "450"),
];

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The template file could not be read.
    #[error("Failed to read workflow template: {0}")]
    Io(#[from] std::io::Error),

    /// The template is not valid JSON.
    #[error("Invalid workflow template JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The template is not an object of nodes.
    #[error("Workflow template must be a JSON object keyed by node id")]
    NotAnObject,

    /// A node the materializer writes to is absent from the template.
    #[error("Workflow node {node} is missing or has no inputs")]
    MissingNode { node: String },
}

/// Where the render backend should report completed outputs.
#[derive(Debug, Clone)]
pub struct WebhookTarget {
    pub url: String,
    pub secret: Option<String>,
}

/// Per-job values written into the graph.
#[derive(Debug, Clone)]
pub struct WorkflowInputs<'a> {
    pub generation_id: DbId,
    pub model_file_name: &'a str,
    pub reference_image_name: &'a str,
    pub style_prompt: &'a str,
    pub subject_prompt: &'a str,
    pub seed: i64,
}

#[derive(Debug, Clone)]
pub struct WorkflowTemplate {
    graph: Value,
}

impl WorkflowTemplate {
    pub fn from_value(graph: Value) -> Result<Self, WorkflowError> {
        if !graph.is_object() {
            return Err(WorkflowError::NotAnObject);
        }
        Ok(Self { graph })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_value(serde_json::from_str(&raw)?)
    }

    /// Produce a fully parameterized graph for one job.
    pub fn materialize(
        &self,
        inputs: &WorkflowInputs<'_>,
        preset: &ModelPreset,
        webhook: &WebhookTarget,
    ) -> Result<Value, WorkflowError> {
        let mut graph = self.graph.clone();

        set_input(&mut graph, NODE_MESH_LOADER, "mesh", json!(inputs.model_file_name))?;
        set_input(&mut graph, NODE_REFERENCE_IMAGE, "image", json!(inputs.reference_image_name))?;
        set_input(&mut graph, NODE_SAMPLER, "seed", json!(inputs.seed))?;
        set_input(&mut graph, NODE_STYLE_PROMPT, "text", json!(inputs.style_prompt))?;
        set_input(&mut graph, NODE_SUBJECT_PROMPT, "text", json!(inputs.subject_prompt))?;

        apply_preset(&mut graph, preset)?;

        let mut webhook_inputs = serde_json::Map::new();
        webhook_inputs.insert("webhook_url".into(), json!(webhook.url));
        webhook_inputs.insert("generationId".into(), json!(inputs.generation_id));
        webhook_inputs.insert(
            "webhook_secret".into(),
            json!(webhook.secret.as_deref().unwrap_or("")),
        );
        for (name, node) in WEBHOOK_OUTPUTS {
            webhook_inputs.insert(name.into(), json!([node, 0]));
        }

        // from_value guarantees an object.
        if let Some(nodes) = graph.as_object_mut() {
            nodes.insert(
                NODE_WEBHOOK.into(),
                json!({ "class_type": "WebhookNode", "inputs": webhook_inputs }),
            );
        }
        Ok(graph)
    }
}

// ---- private helpers ----

fn apply_preset(graph: &mut Value, preset: &ModelPreset) -> Result<(), WorkflowError> {
    set_input(graph, NODE_CHECKPOINT, "ckpt_name", json!(preset.checkpoint))?;

    let s = &preset.sampler;
    set_input(graph, NODE_SAMPLER, "steps", json!(s.steps))?;
    set_input(graph, NODE_SAMPLER, "cfg", json!(s.cfg))?;
    set_input(graph, NODE_SAMPLER, "sampler_name", json!(s.sampler_name))?;
    set_input(graph, NODE_SAMPLER, "scheduler", json!(s.scheduler))?;

    apply_upscaler(graph, NODE_UPSCALER_1, &preset.upscaler1)?;
    apply_upscaler(graph, NODE_UPSCALER_2, &preset.upscaler2)
}

fn apply_upscaler(graph: &mut Value, node: &str, up: &UpscalerSettings) -> Result<(), WorkflowError> {
    set_input(graph, node, "steps", json!(up.steps))?;
    set_input(graph, node, "cfg", json!(up.cfg))?;
    set_input(graph, node, "sampler_name", json!(up.sampler_name))?;
    set_input(graph, node, "scheduler", json!(up.scheduler))?;
    set_input(graph, node, "upscale_by", json!(up.upscale_by))?;
    set_input(graph, node, "denoise", json!(up.denoise))
}

fn set_input(graph: &mut Value, node: &str, key: &str, value: Value) -> Result<(), WorkflowError> {
    let inputs = graph
        .get_mut(node)
        .and_then(|n| n.get_mut("inputs"))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| WorkflowError::MissingNode {
            node: node.to_string(),
        })?;
    inputs.insert(key.to_string(), value);
    Ok(())
}
