mod state;

pub use state::{
    BuildStatus, DashboardState, LastBuild, SPINNER_FRAMES, format_elapsed, progress_bar,
};
