//! hillclimb-report: Rendering of run results.
//!
//! Turns [`hillclimb_core::RunReport`] results into the summary table and the
//! per-dataset diagnostic blocks printed by the CLI.

pub mod diagnostics;
pub mod style;
pub mod table;

pub use diagnostics::render_diagnostics;
pub use style::Palette;
pub use table::render_summary;
