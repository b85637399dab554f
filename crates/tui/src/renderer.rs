use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph},
};
use state_timeline_core::views::legend::LegendItem;
use state_timeline_core::format::fmt_duration;
use state_timeline_core::theme::{ColorResolver, Theme};
use state_timeline_core::views::tooltip::calculate_tooltip_position;
use state_timeline_protocol::{Paint, RenderCommand, TextAlign, ThemeToken};

use crate::app::App;

const GUTTER_MAX: u16 = 16;

fn to_cell_color(color: state_timeline_protocol::Color, theme: &Theme) -> Color {
    let (r, g, b) = color.over(theme.token(ThemeToken::Background)).to_rgb8();
    Color::Rgb(r, g, b)
}

fn resolve(paint: &Paint, theme: &Theme) -> Color {
    match paint {
        Paint::Token(token) => to_cell_color(theme.token(*token), theme),
        Paint::Solid(color) => to_cell_color(*color, theme),
    }
}

/// Cell span `[start, end)` covered by `[pos, pos + len)`, clipped to
/// `0..limit`.
fn cell_span(pos: f64, len: f64, limit: u16) -> (u16, u16) {
    let clip = |v: f64| v.round().clamp(0.0, f64::from(limit)) as u16;
    (clip(pos), clip(pos + len))
}

/// Paint render commands into `area`; command coordinates are cells
/// relative to the area origin.
pub fn paint_commands(buf: &mut Buffer, area: Rect, commands: &[RenderCommand], theme: &Theme) {
    for cmd in commands {
        match cmd {
            RenderCommand::DrawRect { rect, fill, .. } => {
                let bg = resolve(fill, theme);
                let (x0, x1) = cell_span(rect.x, rect.w, area.width);
                let (y0, y1) = cell_span(rect.y, rect.h, area.height);
                for y in y0..y1 {
                    for x in x0..x1 {
                        buf[(area.x + x, area.y + y)].set_char(' ').set_bg(bg);
                    }
                }
            }
            RenderCommand::StrokeRect {
                rect,
                color: Paint::Token(ThemeToken::HoverHighlight),
                ..
            } => {
                let (x0, x1) = cell_span(rect.x, rect.w, area.width);
                let (y0, y1) = cell_span(rect.y, rect.h, area.height);
                for y in y0..y1 {
                    for x in x0..x1 {
                        buf[(area.x + x, area.y + y)]
                            .set_style(Style::default().add_modifier(Modifier::REVERSED));
                    }
                }
            }
            RenderCommand::DrawText {
                position,
                text,
                color,
                align,
                ..
            } => {
                let len = text.chars().count() as f64;
                let start = match align {
                    TextAlign::Left => position.x,
                    TextAlign::Center => position.x - (len / 2.0).floor(),
                    TextAlign::Right => position.x - len,
                };
                let row = position.y.floor();
                if row < 0.0 || row >= f64::from(area.height) {
                    continue;
                }
                let fg = resolve(color, theme);
                for (i, ch) in text.chars().enumerate() {
                    let col = start + i as f64;
                    if col < 0.0 || col >= f64::from(area.width) {
                        continue;
                    }
                    buf[(area.x + col as u16, area.y + row as u16)].set_char(ch).set_fg(fg);
                }
            }
            // Thin outlines have no cell equivalent; clipping is implied by
            // the area bounds.
            RenderCommand::StrokeRect { .. }
            | RenderCommand::SetClip { .. }
            | RenderCommand::ClearClip
            | RenderCommand::BeginGroup { .. }
            | RenderCommand::EndGroup => {}
        }
    }
}

fn tooltip_lines(app: &App) -> Option<Vec<Line<'static>>> {
    let tip = app.tooltip()?;
    let swatch = tip.color.map_or(Color::Gray, |c| to_cell_color(c, app.theme()));
    let mut lines = vec![
        Line::from(tip.series.clone()),
        Line::from(vec![
            Span::styled("■ ", Style::default().fg(swatch)),
            Span::raw(tip.state.clone()),
        ]),
    ];
    if let Some(duration) = tip.duration {
        lines.push(Line::from(format!("for {}", fmt_duration(duration))));
    }
    Some(lines)
}

fn legend_line(legend: &[LegendItem], theme: &Theme) -> Line<'static> {
    let text = Style::default().fg(to_cell_color(theme.token(ThemeToken::LegendText), theme));
    Line::from(
        legend
            .iter()
            .flat_map(|item| {
                [
                    Span::styled("■ ", Style::default().fg(to_cell_color(item.color, theme))),
                    Span::styled(format!("{}  ", item.label), text),
                ]
            })
            .collect::<Vec<_>>(),
    )
}

fn tooltip_paragraph(lines: Vec<Line<'static>>, theme: &Theme) -> Paragraph<'static> {
    let color = |token| to_cell_color(theme.token(token), theme);
    Paragraph::new(lines)
        .block(Block::bordered().border_style(Style::default().fg(color(ThemeToken::TooltipBorder))))
        .style(
            Style::default()
                .fg(color(ThemeToken::TooltipText))
                .bg(color(ThemeToken::TooltipBackground)),
        )
}

/// Run the interactive viewer until the user quits.
pub fn render_tui(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let names = app.series_names();
    let gutter = names
        .iter()
        .map(|n| n.chars().count() as u16 + 1)
        .max()
        .unwrap_or(0)
        .min(GUTTER_MAX);
    let mut cursor: Option<(u16, u16)> = None;

    loop {
        let size = terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        // header row, plot, legend row
        let plot = Rect::new(
            gutter,
            1,
            area.width.saturating_sub(gutter),
            area.height.saturating_sub(2),
        );
        let commands = app.draw(plot.width, plot.height);
        let legend = app.legend();
        let status = app.status();
        let warning = app.warning();
        let tooltip = tooltip_lines(app);
        let theme = *app.theme();
        let mids: Vec<f64> = app.lane_mids().to_vec();

        terminal.draw(|frame| {
            let header = Block::default()
                .title(status.as_str())
                .style(Style::default().fg(Color::White).bg(Color::DarkGray));
            frame.render_widget(header, Rect::new(0, 0, area.width, 1));

            let bg = to_cell_color(theme.token(ThemeToken::Background), &theme);
            frame.render_widget(
                Block::default().style(Style::default().bg(bg)),
                Rect::new(0, 1, area.width, area.height.saturating_sub(1)),
            );

            if let Some(warning) = &warning {
                let text = Paragraph::new(warning.as_str())
                    .style(Style::default().fg(to_cell_color(theme.token(ThemeToken::TextMuted), &theme)));
                frame.render_widget(text, plot);
                return;
            }

            let fg = to_cell_color(theme.token(ThemeToken::TextPrimary), &theme);
            for (name, mid) in names.iter().zip(&mids) {
                let row = plot.y + (*mid as u16).min(plot.height.saturating_sub(1));
                let label: String = name.chars().take(gutter.saturating_sub(1) as usize).collect();
                frame.render_widget(
                    Paragraph::new(label).style(Style::default().fg(fg)),
                    Rect::new(0, row, gutter, 1),
                );
            }

            paint_commands(frame.buffer_mut(), plot, &commands, &theme);

            frame.render_widget(
                Paragraph::new(legend_line(&legend, &theme)),
                Rect::new(0, area.height.saturating_sub(1), area.width, 1),
            );

            if let (Some(lines), Some((cx, cy))) = (tooltip, cursor) {
                let width = lines.iter().map(Line::width).max().unwrap_or(0) as f64 + 2.0;
                let height = lines.len() as f64 + 2.0;
                let pos = calculate_tooltip_position(
                    f64::from(cx),
                    f64::from(cy),
                    width,
                    height,
                    1.0,
                    1.0,
                    f64::from(area.width),
                    f64::from(area.height),
                );
                let rect = Rect::new(pos.x as u16, pos.y as u16, width as u16, height as u16)
                    .intersection(area);
                frame.render_widget(Clear, rect);
                frame.render_widget(tooltip_paragraph(lines, &theme), rect);
            }
        })?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Left => app.pan(-1.0),
                KeyCode::Right => app.pan(1.0),
                KeyCode::Char('+') | KeyCode::Char('=') => app.zoom(true),
                KeyCode::Char('-') => app.zoom(false),
                KeyCode::Char('m') => app.toggle_mode(),
                KeyCode::Char('v') => app.cycle_labels(),
                _ => {}
            },
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Moved => {
                    let inside = mouse.column >= plot.x
                        && mouse.column < plot.x + plot.width
                        && mouse.row >= plot.y
                        && mouse.row < plot.y + plot.height;
                    cursor = inside.then_some((mouse.column, mouse.row));
                    app.hover(inside.then(|| (mouse.column - plot.x, mouse.row - plot.y)));
                }
                MouseEventKind::ScrollUp => app.zoom(true),
                MouseEventKind::ScrollDown => app.zoom(false),
                MouseEventKind::ScrollLeft => app.pan(-1.0),
                MouseEventKind::ScrollRight => app.pan(1.0),
                _ => {}
            },
            _ => {}
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    Ok(())
}
