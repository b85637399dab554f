//! SVG renderer: converts `RenderCommand` lists into standalone SVG strings.

use std::fmt::Write as _;

use state_timeline_protocol::{Paint, RenderCommand, TextAlign, ThemeToken};

use crate::theme::ColorResolver;

/// Render a list of commands as an SVG document string.
///
/// `width` and `height` are the viewBox dimensions in the same units as the
/// commands (device px). Groups become `<g>` elements and clip rects become
/// `<clipPath>`s applied to the following content.
pub fn render_svg(
    commands: &[RenderCommand],
    width: f64,
    height: f64,
    theme: &dyn ColorResolver,
) -> String {
    let mut svg = String::with_capacity(commands.len() * 160);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}" style="font-family:system-ui,-apple-system,sans-serif">"#,
    );
    let _ = write!(
        svg,
        r#"<rect width="{width}" height="{height}" fill="{}"/>"#,
        theme.token(ThemeToken::Background).to_css(),
    );

    let mut clips = 0usize;
    let mut open_clip = false;
    for cmd in commands {
        match cmd {
            RenderCommand::DrawRect {
                rect, fill, label, ..
            } => {
                let _ = write!(
                    svg,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}">"#,
                    rect.x,
                    rect.y,
                    rect.w,
                    rect.h,
                    resolve(fill, theme),
                );
                if let Some(label) = label {
                    let _ = write!(svg, "<title>{}</title>", escape_xml(label));
                }
                svg.push_str("</rect>");
            }
            RenderCommand::StrokeRect { rect, color, width } => {
                let _ = write!(
                    svg,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="{width}"/>"#,
                    rect.x,
                    rect.y,
                    rect.w,
                    rect.h,
                    resolve(color, theme),
                );
            }
            RenderCommand::DrawText {
                position,
                text,
                color,
                font_size,
                align,
            } => {
                let anchor = match align {
                    TextAlign::Left => "start",
                    TextAlign::Center => "middle",
                    TextAlign::Right => "end",
                };
                let _ = write!(
                    svg,
                    r#"<text x="{}" y="{}" fill="{}" font-size="{font_size}" text-anchor="{anchor}" dominant-baseline="middle" style="pointer-events:none">{}</text>"#,
                    position.x,
                    position.y,
                    resolve(color, theme),
                    escape_xml(text),
                );
            }
            RenderCommand::SetClip { rect } => {
                if open_clip {
                    svg.push_str("</g>");
                }
                clips += 1;
                let _ = write!(
                    svg,
                    r#"<clipPath id="clip{clips}"><rect x="{}" y="{}" width="{}" height="{}"/></clipPath><g clip-path="url(#clip{clips})">"#,
                    rect.x, rect.y, rect.w, rect.h,
                );
                open_clip = true;
            }
            RenderCommand::ClearClip => {
                if open_clip {
                    svg.push_str("</g>");
                    open_clip = false;
                }
            }
            RenderCommand::BeginGroup { id, label } => {
                let _ = write!(svg, r#"<g id="{}">"#, escape_xml(id));
                if let Some(label) = label {
                    let _ = write!(svg, "<title>{}</title>", escape_xml(label));
                }
            }
            RenderCommand::EndGroup => svg.push_str("</g>"),
        }
    }
    if open_clip {
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");
    svg
}

fn resolve(paint: &Paint, theme: &dyn ColorResolver) -> String {
    match paint {
        Paint::Token(token) => theme.token(*token).to_css(),
        Paint::Solid(color) => color.to_css(),
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
