//! Filter-graph compiler.
//!
//! The graph is built by folding an ordered list of stages over a "current
//! base" video label. Each enabled stage appends its nodes and hands the
//! next stage a new base; the terminal stage guarantees the video output is
//! always named [`VIDEO_OUT`], whichever stages ran.
//!
//! Stage order is fixed: speed, GIF overlay, hair overlay, terminal. The
//! hair overlay must sit on top of the GIF, so it always composites last.

use clipforge_common::error::{ClipforgeError, ClipforgeResult};

use crate::config::ProcessingConfig;
use crate::graph::Graph;
use crate::input_plan::{InputPlan, InputRole};
use crate::node::{
    DelayParams, FillColor, FilterNode, FilterOp, OverlayParams, RotateParams, ScaleParams,
    SpeedParams, StreamKind, StreamRef, TimeWindow,
};

/// Video after the speed stage.
pub const VIDEO_AFTER_SPEED: &str = "v1";
/// Video after the GIF composite.
pub const VIDEO_AFTER_GIF: &str = "v2";
/// Terminal video label.
pub const VIDEO_OUT: &str = "v";
/// Terminal audio label.
pub const AUDIO_OUT: &str = "a";

const GIF_DELAYED: &str = "delayed_gif";
const HAIR_SCALED: &str = "scaled_hair";
const HAIR_ROTATED: &str = "rotated_hair";

/// Tempo range a single `atempo` instance accepts.
const ATEMPO_RANGE: std::ops::RangeInclusive<f64> = 0.5..=100.0;

/// Activation window of the GIF overlay: the last `window_secs` of the
/// clip, or the whole clip when it is shorter than the window.
pub fn overlay_window(duration_secs: f64, window_secs: f64) -> TimeWindow {
    let start = if duration_secs > window_secs {
        duration_secs - window_secs
    } else {
        0.0
    };
    TimeWindow::new(start, duration_secs)
}

/// Compile the filter graph for one request.
///
/// Fails with `InvalidDuration` when `source_duration_secs` is not a finite
/// positive number and with `InvalidConfiguration` when the configuration
/// or the plan cannot produce a valid graph. Never clamps bad input.
pub fn compile_graph(
    config: &ProcessingConfig,
    plan: &InputPlan,
    source_duration_secs: f64,
) -> ClipforgeResult<Graph> {
    validate_duration(source_duration_secs)?;
    config.validate()?;

    if !ATEMPO_RANGE.contains(&config.speed_factor) {
        tracing::warn!(
            speed_factor = config.speed_factor,
            "Speed factor is outside the range a single atempo filter accepts"
        );
    }

    let cx = StageContext {
        config,
        plan,
        duration_secs: source_duration_secs,
    };

    let mut acc = Accumulator {
        nodes: Vec::new(),
        base: StreamRef::input(plan.main().index, StreamKind::Video),
        overlay_window: None,
    };
    for stage in STAGES {
        if !stage.enabled(&cx) {
            tracing::trace!(stage = stage.name(), "Stage skipped");
            continue;
        }
        let output = stage.apply(&cx, acc.base)?;
        tracing::trace!(
            stage = stage.name(),
            nodes = output.nodes.len(),
            base = %output.base,
            "Stage applied"
        );
        acc.nodes.extend(output.nodes);
        acc.base = output.base;
        acc.overlay_window = acc.overlay_window.or(output.overlay_window);
    }

    let graph = Graph::new(acc.nodes, VIDEO_OUT, AUDIO_OUT, acc.overlay_window);
    debug_assert!(graph.validate_topology(plan).is_ok());

    tracing::debug!(
        duration_secs = source_duration_secs,
        nodes = graph.nodes().len(),
        inputs = plan.len(),
        overlay_start = graph.overlay_window().map(|w| w.start_secs),
        "Filter graph compiled"
    );

    Ok(graph)
}

fn validate_duration(duration_secs: f64) -> ClipforgeResult<()> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(ClipforgeError::invalid_duration(format!(
            "source duration must be finite and > 0, got {duration_secs}"
        )));
    }
    Ok(())
}

struct StageContext<'a> {
    config: &'a ProcessingConfig,
    plan: &'a InputPlan,
    duration_secs: f64,
}

impl StageContext<'_> {
    fn overlay_input(&self, role: InputRole) -> ClipforgeResult<StreamRef> {
        self.plan
            .slot(role)
            .map(|slot| slot.stream(StreamKind::Video))
            .ok_or_else(|| {
                ClipforgeError::invalid_configuration(format!(
                    "{} is enabled but the input plan has no slot for it",
                    role.as_str()
                ))
            })
    }
}

struct Accumulator {
    nodes: Vec<FilterNode>,
    base: StreamRef,
    overlay_window: Option<TimeWindow>,
}

struct StageOutput {
    nodes: Vec<FilterNode>,
    base: StreamRef,
    overlay_window: Option<TimeWindow>,
}

impl StageOutput {
    fn new(nodes: Vec<FilterNode>, base: StreamRef) -> Self {
        Self {
            nodes,
            base,
            overlay_window: None,
        }
    }
}

trait Stage: Sync {
    fn name(&self) -> &'static str;

    fn enabled(&self, cx: &StageContext<'_>) -> bool;

    /// Append this stage's nodes on top of `base` and return the new base.
    fn apply(&self, cx: &StageContext<'_>, base: StreamRef) -> ClipforgeResult<StageOutput>;
}

const STAGES: &[&dyn Stage] = &[
    &SpeedStage,
    &SubscribeOverlayStage,
    &HairOverlayStage,
    &TerminalStage,
];

/// Retimes main video by `1/speed` and main audio tempo by `speed`.
struct SpeedStage;

impl Stage for SpeedStage {
    fn name(&self) -> &'static str {
        "speed"
    }

    fn enabled(&self, _cx: &StageContext<'_>) -> bool {
        true
    }

    fn apply(&self, cx: &StageContext<'_>, base: StreamRef) -> ClipforgeResult<StageOutput> {
        let params = SpeedParams {
            factor: cx.config.speed_factor,
        };
        let main = cx.plan.main();
        let nodes = vec![
            FilterNode::new(FilterOp::SpeedAdjustVideo(params), vec![base], VIDEO_AFTER_SPEED),
            FilterNode::new(
                FilterOp::SpeedAdjustAudio(params),
                vec![main.stream(StreamKind::Audio)],
                AUDIO_OUT,
            ),
        ];
        Ok(StageOutput::new(nodes, StreamRef::label(VIDEO_AFTER_SPEED)))
    }
}

/// Delays the looping GIF to the overlay window and composites it, centered,
/// only while `t` is inside that window.
struct SubscribeOverlayStage;

impl Stage for SubscribeOverlayStage {
    fn name(&self) -> &'static str {
        "subscribe_overlay"
    }

    fn enabled(&self, cx: &StageContext<'_>) -> bool {
        cx.config.enable_subscribe_overlay
    }

    fn apply(&self, cx: &StageContext<'_>, base: StreamRef) -> ClipforgeResult<StageOutput> {
        let gif = cx.overlay_input(InputRole::GifOverlay)?;
        let window = overlay_window(cx.duration_secs, cx.config.overlay_window_secs);

        let nodes = vec![
            FilterNode::new(
                FilterOp::Delay(DelayParams {
                    offset_secs: window.start_secs,
                }),
                vec![gif],
                GIF_DELAYED,
            ),
            FilterNode::new(
                FilterOp::CompositeOverlay(OverlayParams {
                    format_auto: true,
                    enable: Some(window),
                    ..OverlayParams::centered()
                }),
                vec![base, StreamRef::label(GIF_DELAYED)],
                VIDEO_AFTER_GIF,
            ),
        ];

        Ok(StageOutput {
            nodes,
            base: StreamRef::label(VIDEO_AFTER_GIF),
            overlay_window: Some(window),
        })
    }
}

/// Scales the hair PNG to a square, rotates it with a transparent fill and
/// composites it, centered, for the whole clip.
struct HairOverlayStage;

impl Stage for HairOverlayStage {
    fn name(&self) -> &'static str {
        "hair_overlay"
    }

    fn enabled(&self, cx: &StageContext<'_>) -> bool {
        cx.config.enable_hair_overlay
    }

    fn apply(&self, cx: &StageContext<'_>, base: StreamRef) -> ClipforgeResult<StageOutput> {
        let hair = cx.overlay_input(InputRole::HairOverlay)?;
        let size = cx.config.hair_size;

        let nodes = vec![
            FilterNode::new(
                FilterOp::Scale(ScaleParams {
                    width: size,
                    height: size,
                }),
                vec![hair],
                HAIR_SCALED,
            ),
            FilterNode::new(
                FilterOp::Rotate(RotateParams {
                    radians: cx.config.rotation_radians(),
                    fill: FillColor::Transparent,
                }),
                vec![StreamRef::label(HAIR_SCALED)],
                HAIR_ROTATED,
            ),
            FilterNode::new(
                FilterOp::CompositeOverlay(OverlayParams::centered()),
                vec![base, StreamRef::label(HAIR_ROTATED)],
                VIDEO_OUT,
            ),
        ];

        Ok(StageOutput::new(nodes, StreamRef::label(VIDEO_OUT)))
    }
}

/// Renames whatever base is left to the terminal label.
struct TerminalStage;

impl Stage for TerminalStage {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn enabled(&self, _cx: &StageContext<'_>) -> bool {
        true
    }

    fn apply(&self, _cx: &StageContext<'_>, base: StreamRef) -> ClipforgeResult<StageOutput> {
        if base.as_label() == Some(VIDEO_OUT) {
            return Ok(StageOutput::new(Vec::new(), base));
        }
        let node = FilterNode::new(FilterOp::Passthrough, vec![base], VIDEO_OUT);
        Ok(StageOutput::new(vec![node], StreamRef::label(VIDEO_OUT)))
    }
}
