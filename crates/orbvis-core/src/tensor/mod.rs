pub mod band;
pub mod orbital;

pub use band::{BandTensor, NestedEigenvalues, NestedProjections, ProjectionTensor, SpinLayout};
pub use orbital::{ORBITAL_NAMES, OrbitalGroup};
