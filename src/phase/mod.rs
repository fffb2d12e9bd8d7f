mod model;

pub use model::{PREPARING, Phase, PhaseLine, PhaseModel, PhaseStatus, Row};
