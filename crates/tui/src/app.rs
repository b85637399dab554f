use std::sync::Arc;

use state_timeline_core::model::{
    AlignedFrame, DataFrame, PanelOptions, TimeRange, TimelineMode, VisibilityMode,
};
use state_timeline_core::prepare::{TimelineWarning, join_frames, prepare_timeline_fields};
use state_timeline_core::svg::render_svg;
use state_timeline_core::theme::Theme;
use state_timeline_core::views::hover::HoverEvent;
use state_timeline_core::views::legend::{LegendItem, prepare_legend_items};
use state_timeline_core::views::timeline::{FrameSeries, TimelineLayout};
use state_timeline_core::views::tooltip::{TooltipContent, tooltip_content};
use state_timeline_protocol::{Point, RenderCommand, Viewport};
use tracing::{debug, info};

const PAN_FRACTION: f64 = 0.1;
const ZOOM_FACTOR: f64 = 1.3;

/// Viewer state: the joined frame, panel options, visible window and the
/// layout engine whose hover state survives redraws.
pub struct App {
    frame: Result<AlignedFrame, TimelineWarning>,
    options: PanelOptions,
    theme: Theme,
    layout: TimelineLayout,
    full: TimeRange,
    view: TimeRange,
    tooltip: Option<TooltipContent>,
}

impl App {
    pub fn new(frames: Vec<DataFrame>, options: PanelOptions, theme: Theme) -> Self {
        let frames: Vec<Arc<DataFrame>> = frames.into_iter().map(Arc::new).collect();
        let frame = prepare_timeline_fields(&frames, options.merge_values, &theme)
            .map(|prepared| join_frames(&prepared));
        let full = frame
            .as_ref()
            .ok()
            .map_or(TimeRange::new(0.0, 1.0), padded_range);
        let series_count = frame.as_ref().map_or(0, AlignedFrame::series_count);
        match &frame {
            Ok(f) => info!(series = series_count, samples = f.len(), "loaded frames"),
            Err(warning) => info!(%warning, "nothing to draw"),
        }
        Self {
            layout: TimelineLayout::new(options.timeline_options(), series_count),
            frame,
            options,
            theme,
            full,
            view: full,
            tooltip: None,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn warning(&self) -> Option<String> {
        self.frame.as_ref().err().map(ToString::to_string)
    }

    pub fn series_names(&self) -> Vec<String> {
        self.frame.as_ref().map_or_else(
            |_| Vec::new(),
            |f| f.fields.iter().map(|field| field.display_name().to_string()).collect(),
        )
    }

    pub fn lane_mids(&self) -> &[f64] {
        self.layout.lane_mids()
    }

    pub fn status(&self) -> String {
        let mode = match self.options.mode {
            TimelineMode::Changes => "changes",
            TimelineMode::Samples => "samples",
        };
        let labels = match self.options.show_value {
            VisibilityMode::Auto => "auto",
            VisibilityMode::Always => "always",
            VisibilityMode::Never => "never",
        };
        format!(
            " state-timeline | {mode} | labels {labels} | zoom {:.1}x | ←→ pan  +/- zoom  m mode  v labels  q quit ",
            self.full.span() / self.view.span()
        )
    }

    /// Lay out the plot for a `width` x `height` cell area.
    pub fn draw(&mut self, width: u16, height: u16) -> Vec<RenderCommand> {
        let Ok(frame) = self.frame.as_ref() else {
            return Vec::new();
        };
        let source = FrameSeries::new(frame, &self.theme);
        let viewport = Viewport::new(0.0, 0.0, f64::from(width), f64::from(height));
        let mut commands = self.layout.draw(&source, &viewport, self.view);
        commands.extend(self.layout.render_hover_marks());
        commands
    }

    /// Cursor moved to plot cell (`col`, `row`); `None` when off the plot.
    pub fn hover(&mut self, cell: Option<(u16, u16)>) {
        let cursor = cell.map(|(col, row)| Point::new(f64::from(col), f64::from(row)));
        match self.layout.set_cursor(cursor) {
            Some(HoverEvent::Hover { id, .. }) => {
                self.tooltip = self
                    .frame
                    .as_ref()
                    .ok()
                    .and_then(|f| tooltip_content(f, id, &self.theme));
                debug!(series = id.series, sample = id.sample, "hover");
            }
            Some(HoverEvent::Leave) => self.tooltip = None,
            None => {}
        }
    }

    pub fn tooltip(&self) -> Option<&TooltipContent> {
        self.tooltip.as_ref()
    }

    pub fn legend(&self) -> Vec<LegendItem> {
        self.frame.as_ref().map_or_else(
            |_| Vec::new(),
            |f| prepare_legend_items(f, &self.options.legend, &self.theme, self.view),
        )
    }

    /// Shift the window by a fraction of its span, staying inside the data.
    pub fn pan(&mut self, direction: f64) {
        let span = self.view.span();
        let from = (self.view.from + direction * span * PAN_FRACTION)
            .clamp(self.full.from, (self.full.to - span).max(self.full.from));
        self.view = TimeRange::new(from, from + span);
    }

    /// Zoom around the window center; never out past the full range.
    pub fn zoom(&mut self, zoom_in: bool) {
        let span = if zoom_in {
            self.view.span() / ZOOM_FACTOR
        } else {
            (self.view.span() * ZOOM_FACTOR).min(self.full.span())
        };
        let center = (self.view.from + self.view.to) / 2.0;
        let from = (center - span / 2.0).clamp(self.full.from, (self.full.to - span).max(self.full.from));
        self.view = TimeRange::new(from, from + span);
    }

    pub fn toggle_mode(&mut self) {
        self.options.mode = match self.options.mode {
            TimelineMode::Changes => TimelineMode::Samples,
            TimelineMode::Samples => TimelineMode::Changes,
        };
        self.layout.set_options(self.options.timeline_options());
    }

    pub fn cycle_labels(&mut self) {
        self.options.show_value = match self.options.show_value {
            VisibilityMode::Auto => VisibilityMode::Always,
            VisibilityMode::Always => VisibilityMode::Never,
            VisibilityMode::Never => VisibilityMode::Auto,
        };
        self.layout.set_options(self.options.timeline_options());
    }

    /// Standalone SVG of the full range.
    pub fn export_svg(&self, width: f64, lane_height: f64) -> String {
        let Ok(frame) = self.frame.as_ref() else {
            return render_svg(&[], width, lane_height, &self.theme);
        };
        let height = lane_height * frame.series_count().max(1) as f64;
        let source = FrameSeries::new(frame, &self.theme);
        let mut layout = TimelineLayout::new(self.options.timeline_options(), frame.series_count());
        let commands = layout.draw(&source, &Viewport::new(0.0, 0.0, width, height), self.full);
        render_svg(&commands, width, height, &self.theme)
    }
}

/// Data range extended by one average sample step so the last state has
/// visible width.
fn padded_range(frame: &AlignedFrame) -> TimeRange {
    let Some(range) = frame.data_range() else {
        return TimeRange::new(0.0, 1.0);
    };
    let steps = frame.len().saturating_sub(1).max(1) as f64;
    let step = if range.span() > 0.0 { range.span() / steps } else { 1000.0 };
    TimeRange::new(range.from, range.to + step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use state_timeline_core::model::{Field, FieldType, Value};

    fn app() -> App {
        let frame = DataFrame::new(vec![
            Field::time("time", &[0.0, 1000.0, 2000.0, 3000.0]),
            Field::new(
                "state",
                FieldType::String,
                ["up", "up", "down", "up"].iter().map(|s| Value::from(*s)).collect(),
            ),
        ]);
        App::new(vec![frame], PanelOptions::default(), Theme::dark())
    }

    #[test]
    fn full_range_pads_the_last_state() {
        let app = app();
        assert_eq!(app.view, TimeRange::new(0.0, 4000.0));
        assert!(app.warning().is_none());
    }

    #[test]
    fn pan_and_zoom_stay_inside_the_data() {
        let mut app = app();
        app.pan(-1.0);
        assert_eq!(app.view, TimeRange::new(0.0, 4000.0));
        app.zoom(true);
        let span = app.view.span();
        assert!(span < 4000.0);
        for _ in 0..20 {
            app.pan(1.0);
        }
        assert!((app.view.to - 4000.0).abs() < 1e-6);
        assert!((app.view.span() - span).abs() < 1e-6);
        for _ in 0..20 {
            app.zoom(false);
        }
        assert_eq!(app.view, TimeRange::new(0.0, 4000.0));
    }

    #[test]
    fn hover_sets_and_clears_the_tooltip() {
        let mut app = app();
        let commands = app.draw(80, 4);
        assert!(!commands.is_empty());
        app.hover(Some((10, 2)));
        assert_eq!(app.tooltip().map(|t| t.state.as_str()), Some("up"));
        app.hover(None);
        assert!(app.tooltip().is_none());
    }

    #[test]
    fn frames_without_time_show_a_warning() {
        let frame = DataFrame::new(vec![Field::new("state", FieldType::String, vec![Value::from("a")])]);
        let mut app = App::new(vec![frame], PanelOptions::default(), Theme::dark());
        assert_eq!(app.warning().as_deref(), Some("Data does not have a time field"));
        assert!(app.draw(80, 4).is_empty());
        assert!(app.legend().is_empty());
    }

    #[test]
    fn mode_and_label_toggles_cycle() {
        let mut app = app();
        app.toggle_mode();
        assert!(app.status().contains("samples"));
        app.cycle_labels();
        app.cycle_labels();
        assert!(app.status().contains("labels never"));
    }
}
