pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, info, muted, success, summary_row, warn};
pub use table::{grid, TableBuilder};
pub use theme::{theme, Theme};
