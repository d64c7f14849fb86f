//! Terminal output for the `structer` binary

pub mod icons;
pub mod output;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, kind_label, section, success, summary_row, warn};
pub use theme::{theme, Theme};
