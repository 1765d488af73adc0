//! Render statistics for the dashboard.

pub mod log;

pub use log::{create_shared_tally, RenderTally, SharedRenderTally, TallyStats};
