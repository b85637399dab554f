pub mod hover;
pub mod lanes;
pub mod legend;
pub mod timeline;
pub mod tooltip;
