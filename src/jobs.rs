use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::{BuildResult, OrchestrationFailure, Phase, Target, TestResult};

/// Append-only record of everything a CI run produced.
///
/// Cloning is cheap and every clone shares the same underlying sequences, so
/// one handle can be moved into each concurrent worker.
pub struct RunState {
    id: Uuid,
    builds: Arc<RwLock<Vec<BuildResult>>>,
    tests: Arc<RwLock<Vec<TestResult>>>,
    orchestration_errors: Arc<RwLock<Vec<OrchestrationFailure>>>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            builds: Arc::new(RwLock::new(Vec::new())),
            tests: Arc::new(RwLock::new(Vec::new())),
            orchestration_errors: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn record_build(&self, result: BuildResult) {
        self.builds.write().push(result);
    }

    pub fn record_test(&self, result: TestResult) {
        self.tests.write().push(result);
    }

    pub fn record_orchestration_error(&self, target: Target, phase: Phase, message: String) {
        self.orchestration_errors.write().push(OrchestrationFailure {
            target,
            phase,
            message,
        });
    }

    pub fn builds(&self) -> Vec<BuildResult> {
        self.builds.read().clone()
    }

    pub fn tests(&self) -> Vec<TestResult> {
        self.tests.read().clone()
    }

    pub fn orchestration_errors(&self) -> Vec<OrchestrationFailure> {
        self.orchestration_errors.read().clone()
    }
}

impl Clone for RunState {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            builds: self.builds.clone(),
            tests: self.tests.clone(),
            orchestration_errors: self.orchestration_errors.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildType;

    #[test]
    fn test_clones_share_records() {
        let state = RunState::new();
        let worker = state.clone();

        worker.record_build(BuildResult::succeeded(Target::Arm, BuildType::Debug, 1.0, 4096));
        worker.record_orchestration_error(Target::Riscv, Phase::Test, "panicked".to_string());

        assert_eq!(state.id(), worker.id());
        assert_eq!(state.builds().len(), 1);
        assert!(state.tests().is_empty());
        assert_eq!(state.orchestration_errors()[0].target, Target::Riscv);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let state = RunState::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let target = if i % 2 == 0 { Target::Arm } else { Target::Riscv };
                        state.record_build(BuildResult::succeeded(target, BuildType::Debug, 0.0, 1));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(state.builds().len(), 800);
    }
}
