//! Compiled filter graph and its serialized form.

use std::collections::HashSet;

use clipforge_common::error::{ClipforgeError, ClipforgeResult};
use serde::Serialize;

use crate::input_plan::InputPlan;
use crate::node::{FilterNode, FilterOp, StreamRef, TimeWindow};

/// Ordered filter nodes plus the terminal stream labels.
///
/// Built fresh per request by [`crate::compile_graph`] and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Graph {
    nodes: Vec<FilterNode>,
    final_video_label: String,
    final_audio_label: String,
    overlay_window: Option<TimeWindow>,
}

impl Graph {
    pub(crate) fn new(
        nodes: Vec<FilterNode>,
        final_video_label: impl Into<String>,
        final_audio_label: impl Into<String>,
        overlay_window: Option<TimeWindow>,
    ) -> Self {
        Self {
            nodes,
            final_video_label: final_video_label.into(),
            final_audio_label: final_audio_label.into(),
            overlay_window,
        }
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn final_video_label(&self) -> &str {
        &self.final_video_label
    }

    pub fn final_audio_label(&self) -> &str {
        &self.final_audio_label
    }

    /// Activation window of the GIF composite, when that stage ran.
    pub fn overlay_window(&self) -> Option<TimeWindow> {
        self.overlay_window
    }

    /// Whether any composite node is present. The engine adapter uses this
    /// to decide on `-shortest`.
    pub fn has_overlay(&self) -> bool {
        self.nodes
            .iter()
            .any(|node| matches!(node.op, FilterOp::CompositeOverlay(_)))
    }

    /// Position of the node producing `label`.
    pub fn producer_of(&self, label: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.output == label)
    }

    /// `-filter_complex` argument: clauses joined with `;` in emission order.
    pub fn to_filter_complex(&self) -> String {
        self.nodes
            .iter()
            .map(FilterNode::to_clause)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// `-map` arguments selecting the terminal streams, e.g. `[v]`.
    pub fn map_args(&self) -> [String; 2] {
        [
            format!("[{}]", self.final_video_label),
            format!("[{}]", self.final_audio_label),
        ]
    }

    pub fn to_json_pretty(&self) -> ClipforgeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the node list is a DAG emitted in dependency order:
    /// every input is a planned engine input or a label produced by an
    /// earlier node, no label is produced twice, pad counts match, and both
    /// terminal labels exist.
    pub fn validate_topology(&self, plan: &InputPlan) -> ClipforgeResult<()> {
        let mut produced: HashSet<&str> = HashSet::new();

        for (position, node) in self.nodes.iter().enumerate() {
            node.op.validate()?;

            if node.inputs.len() != node.op.input_arity() {
                return Err(topology_error(format!(
                    "node {position} ({}) has {} inputs, expected {}",
                    node.op.filter_name(),
                    node.inputs.len(),
                    node.op.input_arity()
                )));
            }

            for input in &node.inputs {
                match input {
                    StreamRef::Input { index, .. } => {
                        if *index >= plan.len() {
                            return Err(topology_error(format!(
                                "node {position} reads input {index} but only {} inputs are planned",
                                plan.len()
                            )));
                        }
                    }
                    StreamRef::Label(label) => {
                        if !produced.contains(label.as_str()) {
                            return Err(topology_error(format!(
                                "node {position} reads [{label}] before it is produced"
                            )));
                        }
                    }
                }
            }

            if !produced.insert(node.output.as_str()) {
                return Err(topology_error(format!(
                    "label [{}] is produced more than once",
                    node.output
                )));
            }
        }

        for terminal in [&self.final_video_label, &self.final_audio_label] {
            if !produced.contains(terminal.as_str()) {
                return Err(topology_error(format!(
                    "terminal label [{terminal}] is never produced"
                )));
            }
        }

        Ok(())
    }
}

fn topology_error(message: String) -> ClipforgeError {
    ClipforgeError::invalid_configuration(format!("filter graph is not well-formed: {message}"))
}
