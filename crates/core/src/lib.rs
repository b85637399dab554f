//! Data preparation, lane/box layout, hit-testing and tooltip placement
//! for state timelines.
//!
//! Views emit [`state_timeline_protocol::RenderCommand`] lists; renderers
//! (terminal, browser, SVG) consume them.

pub mod format;
pub mod model;
pub mod parsers;
pub mod prepare;
pub mod svg;
pub mod theme;
pub mod views;
