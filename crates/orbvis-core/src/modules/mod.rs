pub mod band;
pub mod dos;
pub mod serialization;

mod traits;

pub use band::BandModule;
pub use dos::DosModule;
pub use traits::ModuleExecutor;

use crate::domain::{ComputeArtifact, ComputeRequest, ComputeResult, PlotMode};

/// Runs the module that handles `request.mode`.
pub fn execute_module(request: &ComputeRequest) -> ComputeResult<Vec<ComputeArtifact>> {
    match request.mode {
        PlotMode::Band => BandModule.execute(request),
        PlotMode::Dos => DosModule.execute(request),
    }
}
