//! Hover behaviour of the county shapes.
//!
//! Each shape is either idle or hovered. Entering a shape shows the
//! shared tooltip next to the pointer and dims the shape, moving keeps
//! the tooltip under the pointer, and leaving hides the tooltip and
//! parks it off-screen so the shape beneath its last position still
//! receives its own enter event.

use crate::data::Joiner;
use crate::error::JoinError;
use crate::types::{EducationRecord, Fips};
use std::collections::HashMap;

pub const TOOLTIP_OPACITY: f64 = 0.8;
pub const HOVERED_SHAPE_OPACITY: f64 = 0.1;
pub const RESTING_SHAPE_OPACITY: f64 = 1.0;
pub const POINTER_OFFSET: f64 = 10.0;
pub const OFFSCREEN: f64 = -1000.0;
pub const FADE_MS: u32 = 250;

pub fn tooltip_text(record: &EducationRecord) -> String {
    format!(
        "{}, {}: {}%",
        record.area_name, record.state, record.bachelors_or_higher
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub page_x: f64,
    pub page_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    Hovered,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeInteraction {
    pub state: HoverState,
    pub opacity: f64,
}

impl Default for ShapeInteraction {
    fn default() -> Self {
        Self {
            state: HoverState::Idle,
            opacity: RESTING_SHAPE_OPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub opacity: f64,
    pub left: f64,
    pub top: f64,
    pub text: String,
    pub education: Option<f64>,
}

impl Default for Tooltip {
    fn default() -> Self {
        Self {
            opacity: 0.0,
            left: 0.0,
            top: 0.0,
            text: String::new(),
            education: None,
        }
    }
}

impl Tooltip {
    fn follow(&mut self, event: PointerEvent) {
        self.left = event.page_x + POINTER_OFFSET;
        self.top = event.page_y + POINTER_OFFSET;
    }
}

/// Reference model of hover behaviour for a rendered map. The page does
/// not run Rust: `browser_script` mirrors each transition here in the
/// browser, and the tests below pin down what that script must do.
pub struct InteractionHandler<'a> {
    joiner: Joiner<'a>,
    tooltip: Tooltip,
    shapes: HashMap<Fips, ShapeInteraction>,
}

impl<'a> InteractionHandler<'a> {
    pub fn new(joiner: Joiner<'a>) -> Self {
        Self {
            joiner,
            tooltip: Tooltip::default(),
            shapes: HashMap::new(),
        }
    }

    pub fn tooltip(&self) -> &Tooltip {
        &self.tooltip
    }

    pub fn shape(&self, fips: Fips) -> ShapeInteraction {
        self.shapes.get(&fips).copied().unwrap_or_default()
    }

    pub fn pointer_enter(&mut self, fips: Fips, event: PointerEvent) -> Result<(), JoinError> {
        let record = self.joiner.lookup(fips)?;

        self.tooltip.opacity = TOOLTIP_OPACITY;
        self.tooltip.follow(event);
        self.tooltip.text = tooltip_text(record);
        self.tooltip.education = Some(record.bachelors_or_higher);

        self.shapes.insert(
            fips,
            ShapeInteraction {
                state: HoverState::Hovered,
                opacity: HOVERED_SHAPE_OPACITY,
            },
        );
        Ok(())
    }

    pub fn pointer_move(&mut self, fips: Fips, event: PointerEvent) {
        if self.shape(fips).state == HoverState::Hovered {
            self.tooltip.follow(event);
        }
    }

    pub fn pointer_leave(&mut self, fips: Fips) {
        if self.shape(fips).state != HoverState::Hovered {
            return;
        }
        self.tooltip.opacity = 0.0;
        self.tooltip.left = OFFSCREEN;
        self.tooltip.top = OFFSCREEN;
        self.shapes.insert(fips, ShapeInteraction::default());
    }
}

/// Page-side event glue applying the same transitions to the rendered
/// `path.county` elements and `#tooltip`.
pub fn browser_script() -> String {
    format!(
        r#"(function () {{
  var tooltip = document.getElementById("tooltip");
  function follow(event) {{
    tooltip.style.left = event.pageX + {offset} + "px";
    tooltip.style.top = event.pageY + {offset} + "px";
  }}
  document.querySelectorAll("path.county").forEach(function (shape) {{
    var hovered = false;
    shape.addEventListener("mouseover", function (event) {{
      hovered = true;
      tooltip.style.opacity = {tooltip_opacity};
      follow(event);
      tooltip.setAttribute("data-education", shape.getAttribute("data-education"));
      tooltip.textContent = shape.getAttribute("data-tooltip");
      shape.style.opacity = {hovered_opacity};
    }});
    shape.addEventListener("mousemove", function (event) {{
      if (hovered) follow(event);
    }});
    shape.addEventListener("mouseout", function () {{
      if (!hovered) return;
      hovered = false;
      tooltip.style.opacity = 0;
      tooltip.style.left = "{offscreen}px";
      tooltip.style.top = "{offscreen}px";
      shape.style.opacity = {resting_opacity};
    }});
  }});
}})();"#,
        offset = POINTER_OFFSET,
        tooltip_opacity = TOOLTIP_OPACITY,
        hovered_opacity = HOVERED_SHAPE_OPACITY,
        resting_opacity = RESTING_SHAPE_OPACITY,
        offscreen = OFFSCREEN,
    )
}
