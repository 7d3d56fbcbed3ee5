//! Assignment of media inputs to positional ffmpeg input slots.

use serde::{Deserialize, Serialize};

use crate::config::ProcessingConfig;
use crate::node::{StreamKind, StreamRef};

/// Logical role of an engine input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputRole {
    /// The source video. Always slot 0.
    Main,
    GifOverlay,
    HairOverlay,
}

impl InputRole {
    /// Auxiliary roles in the order they are attached.
    pub const OVERLAY_ORDER: [InputRole; 2] = [InputRole::GifOverlay, InputRole::HairOverlay];

    pub fn as_str(self) -> &'static str {
        match self {
            InputRole::Main => "main",
            InputRole::GifOverlay => "gif_overlay",
            InputRole::HairOverlay => "hair_overlay",
        }
    }

    fn enabled_in(self, config: &ProcessingConfig) -> bool {
        match self {
            InputRole::Main => true,
            InputRole::GifOverlay => config.enable_subscribe_overlay,
            InputRole::HairOverlay => config.enable_hair_overlay,
        }
    }
}

/// One attached input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSlot {
    pub role: InputRole,
    pub index: usize,
}

impl InputSlot {
    /// Raw stream reference into this input, e.g. `1:v`.
    pub fn stream(&self, kind: StreamKind) -> StreamRef {
        StreamRef::input(self.index, kind)
    }
}

/// Ordered role → slot mapping. Slots are stored by ascending index and
/// `Main` is always present at index 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputPlan {
    slots: Vec<InputSlot>,
}

/// Decide which inputs are attached and at which index.
pub fn build_input_plan(config: &ProcessingConfig) -> InputPlan {
    let mut slots = vec![InputSlot {
        role: InputRole::Main,
        index: 0,
    }];
    for role in InputRole::OVERLAY_ORDER {
        if role.enabled_in(config) {
            slots.push(InputSlot {
                role,
                index: slots.len(),
            });
        }
    }
    InputPlan { slots }
}

impl InputPlan {
    pub fn index_of(&self, role: InputRole) -> Option<usize> {
        self.slots
            .iter()
            .find(|slot| slot.role == role)
            .map(|slot| slot.index)
    }

    pub fn slot(&self, role: InputRole) -> Option<InputSlot> {
        self.slots.iter().copied().find(|slot| slot.role == role)
    }

    pub fn main(&self) -> InputSlot {
        self.slots[0]
    }

    pub fn gif_overlay(&self) -> Option<usize> {
        self.index_of(InputRole::GifOverlay)
    }

    pub fn hair_overlay(&self) -> Option<usize> {
        self.index_of(InputRole::HairOverlay)
    }

    /// Number of attached inputs, including the main one.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false: the main input is always attached.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputSlot> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(subscribe: bool, hair: bool) -> ProcessingConfig {
        ProcessingConfig {
            enable_subscribe_overlay: subscribe,
            enable_hair_overlay: hair,
            ..ProcessingConfig::default()
        }
    }

    #[test]
    fn test_main_only_when_overlays_disabled() {
        let plan = build_input_plan(&config(false, false));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.main().role, InputRole::Main);
        assert_eq!(plan.main().index, 0);
        assert_eq!(plan.gif_overlay(), None);
        assert_eq!(plan.hair_overlay(), None);
    }

    #[test]
    fn test_gif_before_hair() {
        let plan = build_input_plan(&config(true, true));
        assert_eq!(plan.index_of(InputRole::Main), Some(0));
        assert_eq!(plan.gif_overlay(), Some(1));
        assert_eq!(plan.hair_overlay(), Some(2));
    }

    #[test]
    fn test_single_overlay_takes_slot_one() {
        let plan = build_input_plan(&config(false, true));
        assert_eq!(plan.hair_overlay(), Some(1));
        assert_eq!(plan.gif_overlay(), None);

        let plan = build_input_plan(&config(true, false));
        assert_eq!(plan.gif_overlay(), Some(1));
        assert_eq!(plan.hair_overlay(), None);
    }

    #[test]
    fn test_slots_are_consecutive() {
        let plan = build_input_plan(&config(true, true));
        let indices: Vec<usize> = plan.iter().map(|slot| slot.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_slot_stream_refs() {
        let plan = build_input_plan(&config(true, false));
        let gif = plan.slot(InputRole::GifOverlay).unwrap();
        assert_eq!(gif.stream(StreamKind::Video).to_string(), "1:v");
        assert_eq!(plan.main().stream(StreamKind::Audio).to_string(), "0:a");
    }
}
