//! Filter nodes and their closed per-operation parameter schema.
//!
//! Each [`FilterOp`] variant owns exactly the parameters its ffmpeg filter
//! accepts, so a node cannot be serialized with a missing or foreign option.

use std::fmt;

use clipforge_common::error::{ClipforgeError, ClipforgeResult};
use serde::{Deserialize, Serialize, Serializer};

/// Media type selector of a raw input reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub fn specifier(self) -> char {
        match self {
            StreamKind::Video => 'v',
            StreamKind::Audio => 'a',
        }
    }
}

/// A filter input: either a stream of an engine input or a label produced
/// by an earlier node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamRef {
    Input { index: usize, kind: StreamKind },
    Label(String),
}

impl StreamRef {
    pub fn input(index: usize, kind: StreamKind) -> Self {
        StreamRef::Input { index, kind }
    }

    pub fn label(label: impl Into<String>) -> Self {
        StreamRef::Label(label.into())
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            StreamRef::Label(label) => Some(label),
            StreamRef::Input { .. } => None,
        }
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRef::Input { index, kind } => write!(f, "{index}:{}", kind.specifier()),
            StreamRef::Label(label) => f.write_str(label),
        }
    }
}

impl Serialize for StreamRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Closed time interval, in output seconds, during which a composite is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl TimeWindow {
    pub fn new(start_secs: f64, end_secs: f64) -> Self {
        Self {
            start_secs,
            end_secs,
        }
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_secs && t <= self.end_secs
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// ffmpeg timeline expression, e.g. `between(t,7,10)`.
    pub fn enable_expr(&self) -> String {
        format!(
            "between(t,{},{})",
            format_number(self.start_secs),
            format_number(self.end_secs)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedParams {
    /// Forward speed-up factor.
    pub factor: f64,
}

impl SpeedParams {
    /// Timestamp multiplier for `setpts`: the reciprocal of the speed-up.
    pub fn pts_scale(&self) -> f64 {
        1.0 / self.factor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayParams {
    pub offset_secs: f64,
}

/// Where the overlay is placed on the main frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPosition {
    Centered,
}

impl OverlayPosition {
    pub fn x_expr(self) -> &'static str {
        match self {
            OverlayPosition::Centered => "(main_w-overlay_w)/2",
        }
    }

    pub fn y_expr(self) -> &'static str {
        match self {
            OverlayPosition::Centered => "(main_h-overlay_h)/2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayParams {
    pub position: OverlayPosition,

    /// Let the engine pick an alpha-capable blend format.
    pub format_auto: bool,

    /// Active window; `None` means always active.
    pub enable: Option<TimeWindow>,
}

impl OverlayParams {
    pub fn centered() -> Self {
        Self {
            position: OverlayPosition::Centered,
            format_auto: false,
            enable: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub width: u32,
    pub height: u32,
}

/// Fill color for the corners uncovered by rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillColor {
    Transparent,
}

impl FillColor {
    pub fn as_str(self) -> &'static str {
        match self {
            FillColor::Transparent => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotateParams {
    pub radians: f64,
    pub fill: FillColor,
}

/// One filter operation with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "params", rename_all = "snake_case")]
pub enum FilterOp {
    SpeedAdjustVideo(SpeedParams),
    SpeedAdjustAudio(SpeedParams),
    Delay(DelayParams),
    CompositeOverlay(OverlayParams),
    Scale(ScaleParams),
    Rotate(RotateParams),
    Passthrough,
}

impl FilterOp {
    /// ffmpeg filter name.
    pub fn filter_name(&self) -> &'static str {
        match self {
            FilterOp::SpeedAdjustVideo(_) | FilterOp::Delay(_) => "setpts",
            FilterOp::SpeedAdjustAudio(_) => "atempo",
            FilterOp::CompositeOverlay(_) => "overlay",
            FilterOp::Scale(_) => "scale",
            FilterOp::Rotate(_) => "rotate",
            FilterOp::Passthrough => "null",
        }
    }

    /// Number of input pads the filter consumes.
    pub fn input_arity(&self) -> usize {
        match self {
            FilterOp::CompositeOverlay(_) => 2,
            _ => 1,
        }
    }

    /// Option string following `=`; `None` for filters without options.
    pub fn render_options(&self) -> Option<String> {
        match self {
            FilterOp::SpeedAdjustVideo(p) => Some(format!("{}*PTS", format_number(p.pts_scale()))),
            FilterOp::SpeedAdjustAudio(p) => Some(format_number(p.factor)),
            FilterOp::Delay(p) => Some(format!("PTS+{}/TB", format_number(p.offset_secs))),
            FilterOp::CompositeOverlay(p) => {
                let mut pairs = vec![
                    ("x", p.position.x_expr().to_string()),
                    ("y", p.position.y_expr().to_string()),
                ];
                if p.format_auto {
                    pairs.push(("format", "auto".to_string()));
                }
                if let Some(window) = p.enable {
                    pairs.push(("enable", window.enable_expr()));
                }
                Some(render_key_values(&pairs))
            }
            FilterOp::Scale(p) => Some(format!("{}:{}", p.width, p.height)),
            FilterOp::Rotate(p) => Some(format!(
                "{}:fillcolor={}",
                format_number(p.radians),
                p.fill.as_str()
            )),
            FilterOp::Passthrough => None,
        }
    }

    /// Reject parameters that would render as nonsense.
    pub fn validate(&self) -> ClipforgeResult<()> {
        match self {
            FilterOp::SpeedAdjustVideo(p) | FilterOp::SpeedAdjustAudio(p) => {
                if !p.factor.is_finite() || p.factor <= 0.0 {
                    return Err(ClipforgeError::invalid_configuration(format!(
                        "{} factor must be finite and > 0, got {}",
                        self.filter_name(),
                        p.factor
                    )));
                }
            }
            FilterOp::Delay(p) => {
                if !p.offset_secs.is_finite() || p.offset_secs < 0.0 {
                    return Err(ClipforgeError::invalid_configuration(format!(
                        "delay offset must be finite and >= 0, got {}",
                        p.offset_secs
                    )));
                }
            }
            FilterOp::CompositeOverlay(p) => {
                if let Some(window) = p.enable {
                    let finite = window.start_secs.is_finite() && window.end_secs.is_finite();
                    if !finite || window.start_secs < 0.0 || window.start_secs > window.end_secs {
                        return Err(ClipforgeError::invalid_configuration(format!(
                            "overlay window [{}, {}] is not a valid interval",
                            window.start_secs, window.end_secs
                        )));
                    }
                }
            }
            FilterOp::Scale(p) => {
                if p.width == 0 || p.height == 0 {
                    return Err(ClipforgeError::invalid_configuration(format!(
                        "scale target {}x{} has a zero dimension",
                        p.width, p.height
                    )));
                }
            }
            FilterOp::Rotate(p) => {
                if !p.radians.is_finite() {
                    return Err(ClipforgeError::invalid_configuration(format!(
                        "rotation angle must be finite, got {}",
                        p.radians
                    )));
                }
            }
            FilterOp::Passthrough => {}
        }
        Ok(())
    }
}

/// A single filter-graph clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterNode {
    #[serde(flatten)]
    pub op: FilterOp,
    pub inputs: Vec<StreamRef>,
    pub output: String,
}

impl FilterNode {
    pub fn new(op: FilterOp, inputs: Vec<StreamRef>, output: impl Into<String>) -> Self {
        Self {
            op,
            inputs,
            output: output.into(),
        }
    }

    /// Render as `[in][in]filter=options[out]`.
    pub fn to_clause(&self) -> String {
        let mut clause = String::new();
        for input in &self.inputs {
            clause.push('[');
            clause.push_str(&input.to_string());
            clause.push(']');
        }
        clause.push_str(self.op.filter_name());
        if let Some(options) = self.op.render_options() {
            clause.push('=');
            clause.push_str(&options);
        }
        clause.push('[');
        clause.push_str(&self.output);
        clause.push(']');
        clause
    }
}

/// Shortest decimal form that round-trips (`3.0` renders as `3`).
pub fn format_number(value: f64) -> String {
    format!("{value}")
}

/// `key=value` pairs joined by `:`. Values containing `,` are single-quoted
/// so the engine does not treat them as a filter chain separator.
fn render_key_values(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            if value.contains(',') {
                format!("{key}='{value}'")
            } else {
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_ref_display() {
        assert_eq!(StreamRef::input(0, StreamKind::Video).to_string(), "0:v");
        assert_eq!(StreamRef::input(2, StreamKind::Audio).to_string(), "2:a");
        assert_eq!(StreamRef::label("v1").to_string(), "v1");
    }

    #[test]
    fn test_speed_video_uses_reciprocal() {
        let node = FilterNode::new(
            FilterOp::SpeedAdjustVideo(SpeedParams { factor: 1.01 }),
            vec![StreamRef::input(0, StreamKind::Video)],
            "v1",
        );
        assert_eq!(node.to_clause(), "[0:v]setpts=0.9900990099009901*PTS[v1]");
    }

    #[test]
    fn test_speed_audio_uses_forward_factor() {
        let node = FilterNode::new(
            FilterOp::SpeedAdjustAudio(SpeedParams { factor: 1.01 }),
            vec![StreamRef::input(0, StreamKind::Audio)],
            "a",
        );
        assert_eq!(node.to_clause(), "[0:a]atempo=1.01[a]");
    }

    #[test]
    fn test_delay_clause() {
        let node = FilterNode::new(
            FilterOp::Delay(DelayParams { offset_secs: 7.5 }),
            vec![StreamRef::input(1, StreamKind::Video)],
            "delayed_gif",
        );
        assert_eq!(node.to_clause(), "[1:v]setpts=PTS+7.5/TB[delayed_gif]");
    }

    #[test]
    fn test_windowed_overlay_quotes_enable_expr() {
        let node = FilterNode::new(
            FilterOp::CompositeOverlay(OverlayParams {
                format_auto: true,
                enable: Some(TimeWindow::new(7.0, 10.0)),
                ..OverlayParams::centered()
            }),
            vec![StreamRef::label("v1"), StreamRef::label("delayed_gif")],
            "v2",
        );
        assert_eq!(
            node.to_clause(),
            "[v1][delayed_gif]overlay=x=(main_w-overlay_w)/2:y=(main_h-overlay_h)/2:format=auto:enable='between(t,7,10)'[v2]"
        );
    }

    #[test]
    fn test_rotate_and_scale_clauses() {
        let scale = FilterNode::new(
            FilterOp::Scale(ScaleParams {
                width: 360,
                height: 360,
            }),
            vec![StreamRef::input(2, StreamKind::Video)],
            "scaled_hair",
        );
        assert_eq!(scale.to_clause(), "[2:v]scale=360:360[scaled_hair]");

        let rotate = FilterNode::new(
            FilterOp::Rotate(RotateParams {
                radians: 45.0 * std::f64::consts::PI / 180.0,
                fill: FillColor::Transparent,
            }),
            vec![StreamRef::label("scaled_hair")],
            "rotated_hair",
        );
        assert_eq!(
            rotate.to_clause(),
            "[scaled_hair]rotate=0.7853981633974483:fillcolor=none[rotated_hair]"
        );
    }

    #[test]
    fn test_passthrough_has_no_options() {
        let node = FilterNode::new(FilterOp::Passthrough, vec![StreamRef::label("v2")], "v");
        assert_eq!(node.to_clause(), "[v2]null[v]");
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        assert!(FilterOp::SpeedAdjustAudio(SpeedParams { factor: 0.0 })
            .validate()
            .is_err());
        assert!(FilterOp::Delay(DelayParams { offset_secs: -1.0 })
            .validate()
            .is_err());
        assert!(FilterOp::Scale(ScaleParams {
            width: 0,
            height: 360
        })
        .validate()
        .is_err());
        let inverted = FilterOp::CompositeOverlay(OverlayParams {
            enable: Some(TimeWindow::new(5.0, 2.0)),
            ..OverlayParams::centered()
        });
        assert!(inverted.validate().is_err());
        assert!(FilterOp::Passthrough.validate().is_ok());
    }

    #[test]
    fn test_window_contains_is_closed() {
        let window = TimeWindow::new(0.0, 2.0);
        assert!(window.contains(0.0));
        assert!(window.contains(2.0));
        assert!(!window.contains(2.01));
        assert_eq!(window.duration_secs(), 2.0);
    }

    #[test]
    fn test_node_serializes_with_op_tag() {
        let node = FilterNode::new(
            FilterOp::Scale(ScaleParams {
                width: 360,
                height: 360,
            }),
            vec![StreamRef::input(1, StreamKind::Video)],
            "scaled_hair",
        );
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["op"], "scale");
        assert_eq!(json["params"]["width"], 360);
        assert_eq!(json["inputs"][0], "1:v");
        assert_eq!(json["output"], "scaled_hair");
    }
}
