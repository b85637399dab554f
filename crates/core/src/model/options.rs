use serde::{Deserialize, Serialize};

use crate::views::timeline::TimelineOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineMode {
    /// Boxes span from one state change to the next.
    #[default]
    Changes,
    /// One fixed-width column per sample.
    Samples,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityMode {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendDisplayMode {
    #[default]
    List,
    Table,
    Hidden,
}

/// Per-item statistics the legend can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendValue {
    Duration,
    Percentage,
    Occurrences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegendOptions {
    pub show_legend: bool,
    pub display_mode: LegendDisplayMode,
    pub values: Vec<LegendValue>,
}

impl Default for LegendOptions {
    fn default() -> Self {
        Self {
            show_legend: true,
            display_mode: LegendDisplayMode::List,
            values: Vec::new(),
        }
    }
}

/// Panel-level configuration. Every key is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelOptions {
    pub mode: TimelineMode,
    pub merge_values: bool,
    pub show_value: VisibilityMode,
    pub align_value: LabelAlign,
    pub row_height: f64,
    pub col_width: f64,
    pub line_width: f64,
    pub legend: LegendOptions,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            mode: TimelineMode::Changes,
            merge_values: true,
            show_value: VisibilityMode::Auto,
            align_value: LabelAlign::Left,
            row_height: 0.9,
            col_width: 0.9,
            line_width: 0.0,
            legend: LegendOptions::default(),
        }
    }
}

impl PanelOptions {
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Layout-engine options derived from the panel configuration.
    pub fn timeline_options(&self) -> TimelineOptions {
        TimelineOptions {
            mode: self.mode,
            row_height: self.row_height,
            col_width: self.col_width,
            show_value: self.show_value,
            align_value: self.align_value,
            line_width: self.line_width,
            ..TimelineOptions::default()
        }
    }
}
