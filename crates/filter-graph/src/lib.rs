//! Clipforge Filter Graph
//!
//! Turns a processing configuration and a probed source duration into the
//! declarative filter graph handed to ffmpeg:
//! - **Input plan:** which overlay assets are attached, at which input index
//! - **Compiler:** ordered speed / GIF / hair stages folded over a base label
//! - **Serializer:** `-filter_complex` clause rendering
//!
//! ```text
//! [0:v] ── setpts ──[v1]── overlay(gif, windowed) ──[v2]── overlay(hair) ──[v]
//!                          ▲                                ▲
//! [1:v] ── setpts(delay) ──┘      [2:v] ── scale ── rotate ─┘
//! [0:a] ── atempo ──[a]
//! ```
//!
//! This crate is pure computation: no I/O, no process spawning.

pub mod compiler;
pub mod config;
pub mod graph;
pub mod input_plan;
pub mod node;

pub use compiler::{compile_graph, overlay_window};
pub use config::{AssetHandle, ProcessingConfig};
pub use graph::Graph;
pub use input_plan::{build_input_plan, InputPlan, InputRole, InputSlot};
pub use node::{FilterNode, FilterOp, StreamKind, StreamRef, TimeWindow};
