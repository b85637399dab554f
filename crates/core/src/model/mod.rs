pub mod field;
pub mod frame;
pub mod mapping;
pub mod options;
pub mod value;

pub use field::{
    ColorMode, CustomConfig, DisplayValue, Field, FieldColor, FieldConfig, FieldType,
    SpanNulls, Threshold, ThresholdsConfig, ThresholdsMode,
};
pub use frame::{AlignedFrame, DataFrame, TimeRange};
pub use mapping::{
    MappingResult, SpecialValueMatch, ValueMapping, has_special_mapped_value, map_value,
};
pub use options::{
    LabelAlign, LegendDisplayMode, LegendOptions, LegendValue, PanelOptions, TimelineMode,
    VisibilityMode,
};
pub use value::Value;
