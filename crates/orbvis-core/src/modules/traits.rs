use crate::domain::{ComputeArtifact, ComputeRequest, ComputeResult};

pub trait ModuleExecutor {
    fn execute(&self, request: &ComputeRequest) -> ComputeResult<Vec<ComputeArtifact>>;
}

#[cfg(test)]
mod tests {
    use super::ModuleExecutor;
    use crate::domain::{
        ComputeArtifact, ComputeRequest, OrbvisError, OrbvisErrorCategory, PlotMode,
    };

    struct FailingExecutor;

    impl ModuleExecutor for FailingExecutor {
        fn execute(
            &self,
            _request: &ComputeRequest,
        ) -> crate::domain::ComputeResult<Vec<ComputeArtifact>> {
            Err(OrbvisError::computation(
                "RUN.MODULE",
                "module execution failed",
            ))
        }
    }

    #[test]
    fn module_executor_uses_shared_error_types() {
        let request = ComputeRequest::new(PlotMode::Band, "band.in", "band.json", "out");
        let error = FailingExecutor
            .execute(&request)
            .expect_err("executor should fail");
        assert_eq!(error.category(), OrbvisErrorCategory::ComputationError);
        assert_eq!(error.exit_code(), 4);
        assert_eq!(error.code(), "RUN.MODULE");
    }
}
