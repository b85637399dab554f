use std::sync::Arc;

use serde::Serialize;
use state_timeline_core::model::{AlignedFrame, DataFrame, LegendOptions, PanelOptions, TimeRange};
use state_timeline_core::parsers::columnar::ColumnarFrame;
use state_timeline_core::parsers::parse_frames;
use state_timeline_core::prepare::{TimelineWarning, join_frames};
use state_timeline_core::theme::{Theme, ThemeMode};
use state_timeline_core::views::legend::prepare_legend_items;
use state_timeline_core::views::timeline::{FrameSeries, TimelineLayout};
use state_timeline_core::views::tooltip::calculate_tooltip_position as solve_tooltip_position;
use state_timeline_protocol::{Point, Viewport};
use wasm_bindgen::prelude::*;

fn js_err(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn to_json(value: &impl Serialize) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(js_err)
}

#[derive(Serialize)]
#[serde(untagged)]
enum Prepared<'a> {
    Frames { frames: Vec<ColumnarFrame<'a>> },
    Warn { warn: String },
}

fn prepare(data: &[u8], merge_values: bool, theme: &Theme) -> Result<Result<Vec<Arc<DataFrame>>, TimelineWarning>, JsError> {
    let frames: Vec<Arc<DataFrame>> = parse_frames(data)
        .map_err(js_err)?
        .into_iter()
        .map(Arc::new)
        .collect();
    Ok(state_timeline_core::prepare::prepare_timeline_fields(
        &frames,
        merge_values,
        theme,
    ))
}

/// Prepare frames JSON for the timeline. Returns `{"frames": [...]}` with
/// columnar frames (merged repeats listed under `Undef`) or `{"warn": "..."}`.
#[wasm_bindgen]
pub fn prepare_timeline_fields(data: &[u8], merge_values: bool) -> Result<String, JsError> {
    match prepare(data, merge_values, &Theme::dark())? {
        Ok(frames) => to_json(&Prepared::Frames {
            frames: frames.iter().map(|f| ColumnarFrame::new(f)).collect(),
        }),
        Err(warning) => to_json(&Prepared::Warn {
            warn: warning.to_string(),
        }),
    }
}

/// Tooltip origin next to the cursor, as `[x, y]`.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn calculate_tooltip_position(
    cursor_x: f64,
    cursor_y: f64,
    width: f64,
    height: f64,
    x_offset: f64,
    y_offset: f64,
    viewport_width: f64,
    viewport_height: f64,
) -> Vec<f64> {
    let p = solve_tooltip_position(
        cursor_x,
        cursor_y,
        width,
        height,
        x_offset,
        y_offset,
        viewport_width,
        viewport_height,
    );
    vec![p.x, p.y]
}

/// One timeline panel: its options, joined data and layout engine.
#[wasm_bindgen]
pub struct TimelineHandle {
    options: PanelOptions,
    theme: Theme,
    frame: Option<AlignedFrame>,
    layout: TimelineLayout,
}

#[wasm_bindgen]
impl TimelineHandle {
    /// `options_json` holds panel options; `"{}"` takes the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(options_json: &str, dark: bool) -> Result<TimelineHandle, JsError> {
        let options = PanelOptions::from_json(options_json.as_bytes()).map_err(js_err)?;
        let mode = if dark { ThemeMode::Dark } else { ThemeMode::Light };
        Ok(Self {
            layout: TimelineLayout::new(options.timeline_options(), 0),
            options,
            theme: Theme::new(mode),
            frame: None,
        })
    }

    /// Parse, prepare and join frames. Returns the warning text, or
    /// `undefined` when there is something to draw.
    pub fn set_data(&mut self, data: &[u8]) -> Result<Option<String>, JsError> {
        match prepare(data, self.options.merge_values, &self.theme)? {
            Ok(frames) => {
                let joined = join_frames(&frames);
                self.layout.set_series_count(joined.series_count());
                self.frame = Some(joined);
                Ok(None)
            }
            Err(warning) => {
                self.frame = None;
                Ok(Some(warning.to_string()))
            }
        }
    }

    /// Lay out the plot and return render commands as JSON.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        dpr: f64,
        from: f64,
        to: f64,
    ) -> Result<String, JsError> {
        let Some(frame) = self.frame.as_ref() else {
            return Ok("[]".to_string());
        };
        let source = FrameSeries::new(frame, &self.theme);
        let viewport = Viewport {
            x,
            y,
            width,
            height,
            dpr,
        };
        let commands = self.layout.draw(&source, &viewport, TimeRange::new(from, to));
        to_json(&commands)
    }

    /// Cursor in CSS px relative to the plot. Returns the hover event as
    /// JSON, or `undefined` when nothing changed.
    pub fn set_cursor(&mut self, x: f64, y: f64) -> Result<Option<String>, JsError> {
        self.layout
            .set_cursor(Some(Point::new(x, y)))
            .map(|event| to_json(&event))
            .transpose()
    }

    pub fn leave(&mut self) -> Result<Option<String>, JsError> {
        self.layout.set_cursor(None).map(|event| to_json(&event)).transpose()
    }

    /// Per-lane hover rects in CSS px (`null` for lanes without a mark).
    pub fn hover_marks(&self) -> Result<String, JsError> {
        to_json(&self.layout.hover_marks())
    }

    /// Legend items for the visible range. `legend_json` overrides the
    /// panel's legend options when non-empty.
    pub fn legend(&self, legend_json: &str, from: f64, to: f64) -> Result<String, JsError> {
        let Some(frame) = self.frame.as_ref() else {
            return Ok("[]".to_string());
        };
        let options = if legend_json.trim().is_empty() {
            self.options.legend.clone()
        } else {
            serde_json::from_str::<LegendOptions>(legend_json).map_err(js_err)?
        };
        to_json(&prepare_legend_items(
            frame,
            &options,
            &self.theme,
            TimeRange::new(from, to),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use state_timeline_protocol::RenderCommand;

    #[test]
    fn tooltip_position_is_a_pair() {
        let p = calculate_tooltip_position(150.0, 50.0, 100.0, 100.0, 10.0, 10.0, 200.0, 200.0);
        assert_eq!(p, vec![40.0, 60.0]);
    }

    #[test]
    fn prepare_reports_frames_or_warning() {
        let ok = br#"{"fields": [
            {"name": "time", "type": "time", "values": [1, 2]},
            {"name": "state", "type": "string", "values": ["a", "a"]}
        ]}"#;
        let json = prepare_timeline_fields(ok, true).unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap_or_default();
        let data = &value["frames"][0]["data"];
        assert_eq!(data["values"][1], serde_json::json!(["a", null]));
        assert_eq!(data["entities"][1], serde_json::json!({"Undef": [1]}));

        // the exported frames read back with the repeat still merged
        let mut handle = match TimelineHandle::new("{}", true) {
            Ok(handle) => handle,
            Err(_) => return,
        };
        let frames = serde_json::to_vec(&value["frames"]).unwrap_or_default();
        assert!(matches!(handle.set_data(&frames), Ok(None)));
        let commands = handle.draw(0.0, 0.0, 100.0, 10.0, 1.0, 0.0, 2.0).unwrap_or_default();
        let commands: Vec<RenderCommand> = serde_json::from_str(&commands).unwrap_or_default();
        let boxes: Vec<f64> = commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawRect {
                    rect,
                    box_id: Some(_),
                    ..
                } => Some(rect.w),
                _ => None,
            })
            .collect();
        assert_eq!(boxes, vec![50.0]);

        let no_time = br#"{"fields": [{"name": "state", "type": "string", "values": ["a"]}]}"#;
        let json = prepare_timeline_fields(no_time, true).unwrap_or_default();
        assert_eq!(json, r#"{"warn":"Data does not have a time field"}"#);
    }

    #[test]
    fn handle_draws_and_hovers() {
        let Ok(mut handle) = TimelineHandle::new("{}", true) else {
            return;
        };
        let data = br#"{"name": "svc", "fields": [
            {"name": "time", "type": "time", "values": [0, 50]},
            {"name": "state", "type": "string", "values": ["up", "down"]}
        ]}"#;
        assert!(matches!(handle.set_data(data), Ok(None)));
        let commands = handle.draw(0.0, 0.0, 100.0, 10.0, 1.0, 0.0, 100.0).unwrap_or_default();
        assert!(commands.contains("DrawRect"));
        let event = handle.set_cursor(75.0, 5.0).ok().flatten().unwrap_or_default();
        assert!(event.contains(r#""type":"hover""#));
        assert!(matches!(handle.set_cursor(76.0, 5.0), Ok(None)));
        let marks = handle.hover_marks().unwrap_or_default();
        assert_eq!(marks, r#"[{"x":50.0,"y":0.0,"w":50.0,"h":10.0}]"#);
    }
}
