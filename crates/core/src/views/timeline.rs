//! State timeline layout: one lane per series, one box per state span
//! (changes mode) or per sample (samples mode).

use state_timeline_protocol::{
    BoxId, Color, Paint, Point, Rect, RenderCommand, TextAlign, ThemeToken, Viewport,
};
use tracing::trace;

use super::hit_test::QuadTree;
use super::hover::{HoverEvent, HoverTracker};
use super::lanes::{lane_span, lane_spans, round_px};
use crate::format::display_value;
use crate::model::{
    AlignedFrame, ColorMode, Field, FieldConfig, LabelAlign, SpecialValueMatch, TimeRange,
    TimelineMode, Value, VisibilityMode, has_special_mapped_value,
};
use crate::theme::{ColorResolver, FALLBACK_COLOR};

/// Boxes narrower than this (device px) are neither drawn nor hit-tested.
const MIN_BOX_WIDTH: f64 = 1.0;
/// In auto mode, boxes narrower than this get no label.
const AUTO_LABEL_MIN_WIDTH: f64 = 25.0;
const TEXT_PADDING: f64 = 4.0;
const FONT_SIZE: f64 = 12.0;
const LABEL_CONTRAST_RATIO: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineOptions {
    pub mode: TimelineMode,
    /// Fraction of the plot height shared by the lanes.
    pub row_height: f64,
    /// Fraction of the sample spacing a samples-mode column fills.
    pub col_width: f64,
    pub show_value: VisibilityMode,
    pub align_value: LabelAlign,
    /// Box outline width in CSS px; 0 disables strokes.
    pub line_width: f64,
    /// Average glyph advance in CSS px, used to truncate labels.
    pub char_width: f64,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            mode: TimelineMode::Changes,
            row_height: 0.9,
            col_width: 0.9,
            show_value: VisibilityMode::Auto,
            align_value: LabelAlign::Left,
            line_width: 0.0,
            char_width: 7.0,
        }
    }
}

/// Per-series collaborators of the layout engine.
pub trait SeriesSource {
    fn series_count(&self) -> usize;
    /// Shared time axis, epoch milliseconds.
    fn time(&self) -> &[f64];
    fn values(&self, series: usize) -> &[Value];
    fn name(&self, series: usize) -> &str;
    /// Discrete series batch their fills by color.
    fn is_discrete(&self, series: usize) -> bool;
    fn value_color(&self, series: usize, value: &Value) -> Color;
    fn field_config(&self, series: usize) -> Option<&FieldConfig>;
    fn format_value(&self, series: usize, value: &Value) -> String;
    fn contrast_text(&self, background: Color, ratio: f64) -> Color;
    /// Null cells draw as boxes when the series maps them to a state.
    fn draws_nulls(&self, _series: usize) -> bool {
        false
    }
}

/// Whether a cell leaves a gap instead of starting a box.
fn is_gap(value: &Value, draws_nulls: bool) -> bool {
    value.is_unset() || (value.is_nullish() && !draws_nulls)
}

/// [`SeriesSource`] over a joined frame.
pub struct FrameSeries<'a> {
    frame: &'a AlignedFrame,
    theme: &'a dyn ColorResolver,
}

impl<'a> FrameSeries<'a> {
    pub fn new(frame: &'a AlignedFrame, theme: &'a dyn ColorResolver) -> Self {
        Self { frame, theme }
    }
}

impl SeriesSource for FrameSeries<'_> {
    fn series_count(&self) -> usize {
        self.frame.series_count()
    }

    fn time(&self) -> &[f64] {
        &self.frame.time
    }

    fn values(&self, series: usize) -> &[Value] {
        self.frame
            .fields
            .get(series)
            .map(|f| f.values.as_ref())
            .unwrap_or(&[])
    }

    fn name(&self, series: usize) -> &str {
        self.frame
            .fields
            .get(series)
            .map(Field::display_name)
            .unwrap_or("")
    }

    fn is_discrete(&self, series: usize) -> bool {
        self.field_config(series)
            .is_none_or(|c| c.color_mode() != Some(ColorMode::Continuous))
    }

    fn value_color(&self, series: usize, value: &Value) -> Color {
        self.frame
            .fields
            .get(series)
            .and_then(|f| display_value(f, series, value, self.theme).color)
            .unwrap_or_else(|| self.theme.color_by_name(FALLBACK_COLOR))
    }

    fn field_config(&self, series: usize) -> Option<&FieldConfig> {
        self.frame.fields.get(series).map(|f| &f.config)
    }

    fn format_value(&self, series: usize, value: &Value) -> String {
        self.frame
            .fields
            .get(series)
            .map(|f| display_value(f, series, value, self.theme).text)
            .unwrap_or_default()
    }

    fn contrast_text(&self, background: Color, ratio: f64) -> Color {
        self.theme.contrast_text(background, ratio)
    }

    fn draws_nulls(&self, series: usize) -> bool {
        self.frame.fields.get(series).is_some_and(|f| {
            has_special_mapped_value(f, SpecialValueMatch::Null)
                || has_special_mapped_value(f, SpecialValueMatch::NullAndNaN)
        })
    }
}

/// Linear time → device-pixel mapping for the x axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    pub range: TimeRange,
    pub offset: f64,
    pub extent: f64,
}

impl TimeScale {
    pub fn new(range: TimeRange, offset: f64, extent: f64) -> Self {
        Self {
            range,
            offset,
            extent,
        }
    }

    pub fn position(&self, t: f64) -> f64 {
        let span = self.range.span();
        if span <= 0.0 {
            return self.offset;
        }
        self.offset + (t - self.range.from) / span * self.extent
    }
}

/// Box fill: the value color with the field's fill opacity applied, unless
/// the color is already translucent.
pub fn fill_color(config: Option<&FieldConfig>, value_color: Color) -> Color {
    if value_color.a < 1.0 {
        return value_color;
    }
    let opacity = config
        .and_then(|c| c.custom.fill_opacity)
        .unwrap_or(100.0);
    if opacity >= 100.0 {
        return value_color;
    }
    value_color.with_alpha((opacity / 100.0).clamp(0.0, 1.0) as f32)
}

/// One laid-out box. `rect` is in device px relative to the plot origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineBox {
    pub rect: Rect,
    pub id: BoxId,
    pub fill: Color,
}

/// Commands grouped by color, in first-seen color order.
#[derive(Default)]
struct ColorBatches {
    groups: Vec<(Color, Vec<RenderCommand>)>,
}

impl ColorBatches {
    fn push(&mut self, color: Color, command: RenderCommand) {
        match self.groups.iter_mut().find(|(c, _)| *c == color) {
            Some((_, commands)) => commands.push(command),
            None => self.groups.push((color, vec![command])),
        }
    }

    fn drain_into(self, out: &mut Vec<RenderCommand>) {
        for (_, commands) in self.groups {
            out.extend(commands);
        }
    }
}

/// State of one series draw pass.
struct SeriesPass<'s> {
    series: usize,
    top: f64,
    height: f64,
    stroke: f64,
    discrete: bool,
    source: &'s dyn SeriesSource,
    fills: ColorBatches,
    strokes: ColorBatches,
    commands: Vec<RenderCommand>,
}

/// The lane/box layout engine plus its hit-test index and hover state.
///
/// Each [`draw`](Self::draw) starts with [`draw_clear`](Self::draw_clear),
/// which allocates a fresh box arena and empties the quad-tree; the tree is
/// refilled from the arena on the next cursor query.
#[derive(Debug, Clone)]
pub struct TimelineLayout {
    options: TimelineOptions,
    series_count: usize,
    row_height: f64,
    plot: Rect,
    dpr: f64,
    y_mids: Vec<f64>,
    boxes: Vec<Vec<Option<TimelineBox>>>,
    tree: QuadTree<BoxId>,
    tree_filled: bool,
    hover: HoverTracker,
}

impl TimelineLayout {
    pub fn new(options: TimelineOptions, series_count: usize) -> Self {
        Self {
            options,
            series_count,
            row_height: effective_row_height(&options, series_count),
            plot: Rect::new(0.0, 0.0, 0.0, 0.0),
            dpr: 1.0,
            y_mids: Vec::new(),
            boxes: Vec::new(),
            tree: QuadTree::new(Rect::new(0.0, 0.0, 0.0, 0.0)),
            tree_filled: false,
            hover: HoverTracker::new(series_count),
        }
    }

    pub fn options(&self) -> &TimelineOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: TimelineOptions) {
        self.options = options;
        self.row_height = effective_row_height(&options, self.series_count);
    }

    pub fn series_count(&self) -> usize {
        self.series_count
    }

    pub fn set_series_count(&mut self, series_count: usize) {
        self.series_count = series_count;
        self.row_height = effective_row_height(&self.options, series_count);
        self.hover.resize(series_count);
    }

    /// Lane height fraction in use: 1 for a single series.
    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    /// Plot bounding box in device px.
    pub fn plot(&self) -> Rect {
        self.plot
    }

    /// Vertical lane midpoints, device px relative to the plot.
    pub fn lane_mids(&self) -> &[f64] {
        &self.y_mids
    }

    /// Start a new layout: fresh `series x samples` arena, empty index.
    pub fn draw_clear(&mut self, plot: Rect, dpr: f64, sample_count: usize) {
        self.plot = plot;
        self.dpr = dpr;
        self.boxes = vec![vec![None; sample_count]; self.series_count];
        self.tree = QuadTree::new(Rect::new(0.0, 0.0, plot.w, plot.h));
        self.tree_filled = false;
        self.y_mids = lane_spans(self.series_count, self.row_height)
            .into_iter()
            .map(|(off, size)| round_px(plot.h * off + plot.h * size / 2.0))
            .collect();
        self.hover.resize(self.series_count);
    }

    /// Lay out and draw one series.
    pub fn draw_series(
        &mut self,
        series: usize,
        scale: &TimeScale,
        source: &dyn SeriesSource,
    ) -> Vec<RenderCommand> {
        let (off, size) = lane_span(self.series_count, self.row_height, series);
        let mut pass = SeriesPass {
            series,
            top: round_px(self.plot.y + self.plot.h * off),
            height: round_px(self.plot.h * size),
            stroke: round_px(self.options.line_width * self.dpr),
            discrete: source.is_discrete(series),
            source,
            fills: ColorBatches::default(),
            strokes: ColorBatches::default(),
            commands: Vec::new(),
        };

        let time = source.time();
        let values = source.values(series);
        let n = values.len().min(time.len());
        let nulls = source.draws_nulls(series);

        match self.options.mode {
            TimelineMode::Changes => {
                let mut ix = 0;
                while ix < n {
                    if is_gap(&values[ix], nulls) {
                        ix += 1;
                        continue;
                    }
                    let left = round_px(scale.position(time[ix]));
                    let mut next = ix + 1;
                    while next < n && values[next].is_unset() {
                        next += 1;
                    }
                    // the last state runs to the plot edge, not the last sample
                    let right = if next >= n {
                        self.plot.x + self.plot.w + pass.stroke
                    } else {
                        round_px(scale.position(time[next]))
                    };
                    self.put_box(&mut pass, ix, &values[ix], left, right - left);
                    ix = next;
                }
            }
            TimelineMode::Samples => {
                let col = if n >= 2 {
                    scale.position(time[1]) - scale.position(time[0])
                } else {
                    self.plot.w
                };
                let gap = col * (1.0 - self.options.col_width);
                let bar = round_px(col - gap - pass.stroke);
                let shift = bar / 2.0;
                for ix in 0..n {
                    if time[ix] < scale.range.from || time[ix] > scale.range.to {
                        continue;
                    }
                    if is_gap(&values[ix], nulls) {
                        continue;
                    }
                    let left = round_px(scale.position(time[ix]) - shift);
                    self.put_box(&mut pass, ix, &values[ix], left, bar);
                }
            }
        }

        let mut commands = std::mem::take(&mut pass.commands);
        pass.fills.drain_into(&mut commands);
        pass.strokes.drain_into(&mut commands);
        commands
    }

    fn put_box(&mut self, pass: &mut SeriesPass<'_>, sample: usize, value: &Value, left: f64, width: f64) {
        if width < MIN_BOX_WIDTH {
            return;
        }
        let series = pass.series;
        let value_color = pass.source.value_color(series, value);
        let fill = fill_color(pass.source.field_config(series), value_color);
        let id = BoxId::new(series, sample);

        if let Some(slot) = self.boxes.get_mut(series).and_then(|row| row.get_mut(sample)) {
            *slot = Some(TimelineBox {
                rect: Rect::new(
                    round_px(left - self.plot.x),
                    round_px(pass.top - self.plot.y),
                    width,
                    pass.height,
                ),
                id,
                fill,
            });
        }

        let rect = Rect::new(left, pass.top, width, pass.height);
        let fill_cmd = RenderCommand::DrawRect {
            rect,
            fill: Paint::Solid(fill),
            label: Some(pass.source.format_value(series, value)),
            box_id: Some(id),
        };
        let stroke_cmd = (pass.stroke > 0.0).then(|| RenderCommand::StrokeRect {
            rect: rect.inset(pass.stroke / 2.0),
            color: Paint::Solid(value_color),
            width: pass.stroke,
        });

        if pass.discrete {
            pass.fills.push(fill, fill_cmd);
            if let Some(cmd) = stroke_cmd {
                pass.strokes.push(value_color, cmd);
            }
        } else {
            pass.commands.push(fill_cmd);
            pass.commands.extend(stroke_cmd);
        }
    }

    /// Value labels for one series, drawn over its boxes.
    pub fn draw_labels(&self, series: usize, source: &dyn SeriesSource) -> Vec<RenderCommand> {
        if self.options.show_value == VisibilityMode::Never {
            return Vec::new();
        }
        let Some(&y_mid) = self.y_mids.get(series) else {
            return Vec::new();
        };
        let Some(row) = self.boxes.get(series) else {
            return Vec::new();
        };

        let auto = self.options.show_value == VisibilityMode::Auto;
        let stroke = round_px(self.options.line_width * self.dpr);
        let px_per_char = self.options.char_width * self.dpr;
        let y = round_px(self.plot.y + y_mid);
        let x_off = self.plot.x;
        let nulls = source.draws_nulls(series);
        let mut commands = Vec::new();

        for (ix, value) in source.values(series).iter().enumerate() {
            if is_gap(value, nulls) {
                continue;
            }
            let Some(b) = row.get(ix).and_then(Option::as_ref) else {
                continue;
            };
            if auto && b.rect.w < AUTO_LABEL_MIN_WIDTH {
                continue;
            }
            if b.rect.x >= self.plot.w {
                continue;
            }
            let max_chars = if px_per_char > 0.0 {
                (b.rect.w / px_per_char).floor().max(0.0) as usize
            } else {
                usize::MAX
            };

            let (x, align) = match (self.options.mode, self.options.align_value) {
                (TimelineMode::Changes, LabelAlign::Left) => {
                    (round_px(b.rect.x + x_off + stroke + TEXT_PADDING), TextAlign::Left)
                }
                (TimelineMode::Changes, LabelAlign::Right) => (
                    round_px(b.rect.x + x_off + b.rect.w - stroke - TEXT_PADDING),
                    TextAlign::Right,
                ),
                _ => (round_px(b.rect.x + x_off + b.rect.w / 2.0), TextAlign::Center),
            };
            let text: String = source
                .format_value(series, value)
                .chars()
                .take(max_chars)
                .collect();
            if text.is_empty() {
                continue;
            }
            commands.push(RenderCommand::DrawText {
                position: Point::new(x, y),
                text,
                color: Paint::Solid(source.contrast_text(b.fill, LABEL_CONTRAST_RATIO)),
                font_size: FONT_SIZE * self.dpr,
                align,
            });
        }
        commands
    }

    /// One full draw pass over `viewport` (CSS px, with its pixel ratio)
    /// for the time window `range`.
    pub fn draw(
        &mut self,
        source: &dyn SeriesSource,
        viewport: &Viewport,
        range: TimeRange,
    ) -> Vec<RenderCommand> {
        let dpr = viewport.dpr;
        let plot = Rect::new(
            viewport.x * dpr,
            viewport.y * dpr,
            viewport.width * dpr,
            viewport.height * dpr,
        );
        let series_count = source.series_count();
        if series_count != self.series_count {
            self.set_series_count(series_count);
        }
        self.draw_clear(plot, dpr, source.time().len());
        let scale = TimeScale::new(range, plot.x, plot.w);

        let mut commands = vec![
            RenderCommand::BeginGroup {
                id: "state-timeline".to_string(),
                label: None,
            },
            RenderCommand::DrawRect {
                rect: plot,
                fill: Paint::Token(ThemeToken::PlotBackground),
                label: None,
                box_id: None,
            },
            RenderCommand::SetClip { rect: plot },
        ];
        for series in 0..series_count {
            commands.push(RenderCommand::BeginGroup {
                id: format!("series-{series}"),
                label: Some(source.name(series).to_string()),
            });
            commands.extend(self.draw_series(series, &scale, source));
            commands.push(RenderCommand::EndGroup);
        }
        for series in 0..series_count {
            commands.extend(self.draw_labels(series, source));
        }
        commands.push(RenderCommand::ClearClip);
        commands.push(RenderCommand::EndGroup);

        trace!(
            series = series_count,
            boxes = self.box_count(),
            commands = commands.len(),
            "timeline draw"
        );
        commands
    }

    /// Move the cursor (CSS px relative to the plot; `None` when outside).
    ///
    /// In changes mode every lane is sampled at its midpoint and the lane
    /// whose box is within half a box height of the cursor is the one at
    /// the cursor. In samples mode a single point query decides.
    pub fn set_cursor(&mut self, cursor: Option<Point>) -> Option<HoverEvent> {
        if !self.tree_filled {
            for b in self.boxes.iter().flatten().flatten() {
                self.tree.insert(b.rect, b.id);
            }
            self.tree_filled = true;
        }

        let Some(cursor) = cursor else {
            for lane in 0..self.series_count {
                self.hover.update_lane(lane, None);
            }
            return self.hover.settle(None);
        };
        let cx = round_px(cursor.x * self.dpr);
        let cy = round_px(cursor.y * self.dpr);
        let mut at_cursor = None;

        match self.options.mode {
            TimelineMode::Changes => {
                for lane in 0..self.series_count {
                    let found = match self.y_mids.get(lane) {
                        Some(&y_mid) if cx >= 0.0 => self
                            .tree
                            .find_at(cx, y_mid)
                            .map(|(rect, id)| (id, rect, y_mid)),
                        _ => None,
                    };
                    if let Some((id, rect, y_mid)) = found
                        && (cy - y_mid).abs() <= rect.h / 2.0
                    {
                        at_cursor = Some((id, rect));
                    }
                    self.hover
                        .update_lane(lane, found.map(|(id, rect, _)| (id, rect)));
                }
            }
            TimelineMode::Samples => {
                let found = if cx >= 0.0 && cy >= 0.0 {
                    self.tree.find_at(cx, cy).map(|(rect, id)| (id, rect))
                } else {
                    None
                };
                self.hover.update_lane(0, found);
                at_cursor = found;
            }
        }

        self.hover.settle(at_cursor)
    }

    /// Box currently at the cursor.
    pub fn hovered(&self) -> Option<BoxId> {
        self.hover.at_cursor()
    }

    /// Per-lane hover marks in CSS px relative to the plot.
    pub fn hover_marks(&self) -> Vec<Option<Rect>> {
        let dpr = self.dpr;
        self.hover
            .lanes()
            .iter()
            .map(|lane| {
                lane.map(|(_, r)| {
                    Rect::new(
                        round_px(r.x / dpr),
                        round_px(r.y / dpr),
                        round_px(r.w / dpr),
                        round_px(r.h / dpr),
                    )
                })
            })
            .collect()
    }

    /// Hover marks as outline commands in device px.
    pub fn render_hover_marks(&self) -> Vec<RenderCommand> {
        self.hover
            .lanes()
            .iter()
            .flatten()
            .map(|(_, r)| RenderCommand::StrokeRect {
                rect: Rect::new(self.plot.x + r.x, self.plot.y + r.y, r.w, r.h),
                color: Paint::Token(ThemeToken::HoverHighlight),
                width: self.dpr.max(1.0),
            })
            .collect()
    }

    pub fn box_at(&self, id: BoxId) -> Option<&TimelineBox> {
        self.boxes.get(id.series)?.get(id.sample)?.as_ref()
    }

    pub fn boxes(&self) -> impl Iterator<Item = &TimelineBox> {
        self.boxes.iter().flatten().flatten()
    }

    pub fn box_count(&self) -> usize {
        self.boxes().count()
    }
}

fn effective_row_height(options: &TimelineOptions, series_count: usize) -> f64 {
    if series_count == 1 {
        1.0
    } else {
        options.row_height
    }
}
