//! The sequential search loop.

use tracing::{info, warn};

use hs_optimizer::SearchStrategy;
use hs_store::TrialStore;
use hs_types::{ObjectiveDirection, SweepResult, TrialRecord};

use crate::evaluator::Evaluator;
use crate::runner::TrialRunner;

/// Orchestrates one process invocation of the campaign: replay persisted
/// history into the strategy, run `max_evals` trials, return the global best.
///
/// Strictly sequential: each suggestion depends on every earlier outcome, so
/// one evaluation completes fully before the next candidate is drawn.
/// Re-invoking the process with the same store resumes rather than restarts;
/// `max_evals` is per invocation and additive across invocations.
#[derive(Debug, Clone)]
pub struct SearchLoop {
    max_evals: usize,
    direction: ObjectiveDirection,
}

impl SearchLoop {
    pub fn new(max_evals: usize) -> Self {
        Self {
            max_evals,
            direction: ObjectiveDirection::default(),
        }
    }

    pub fn with_direction(mut self, direction: ObjectiveDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Run the campaign batch. Returns the best ok-status trial across the
    /// whole persisted history — possibly one from a previous invocation, or
    /// `None` if no trial has ever succeeded.
    pub fn optimize<E: Evaluator>(
        &self,
        strategy: &mut dyn SearchStrategy,
        evaluator: E,
        store: &mut TrialStore,
    ) -> SweepResult<Option<TrialRecord>> {
        let prior = store.ok_observations();
        if !prior.is_empty() {
            info!(
                trials = store.len(),
                ok = prior.len(),
                strategy = strategy.name(),
                "replaying persisted history into strategy"
            );
            for (config, loss) in &prior {
                strategy.observe(config, *loss);
            }
        }

        let mut runner = TrialRunner::new(evaluator);
        for completed in 0..self.max_evals {
            let number = store.next_trial_number();
            let config = strategy.suggest()?;
            let record = runner.run(store, number, config)?;

            if let Some(loss) = record.loss {
                strategy.observe(&record.config, loss);
            }

            match store.best(self.direction) {
                Some(best) => info!(
                    trial = number,
                    completed = completed + 1,
                    budget = self.max_evals,
                    best_loss = best.loss.unwrap_or(f64::NAN),
                    "trial recorded"
                ),
                None => warn!(
                    trial = number,
                    completed = completed + 1,
                    budget = self.max_evals,
                    "trial recorded; no successful trial yet"
                ),
            }
        }

        Ok(store.best(self.direction).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::TrialOutcome;
    use hs_optimizer::{SearchSpace, TpeSearch};
    use hs_types::Configuration;
    use tempfile::tempdir;

    fn space() -> SearchSpace {
        SearchSpace::new().add_uniform("x", 0.0, 1.0).unwrap()
    }

    fn quadratic(config: &Configuration) -> anyhow::Result<TrialOutcome> {
        let x = config
            .get("x")
            .and_then(|v| v.as_float())
            .ok_or_else(|| anyhow::anyhow!("missing parameter x"))?;
        Ok(TrialOutcome::new((x - 0.3).powi(2)))
    }

    #[test]
    fn runs_exactly_max_evals_trials() {
        let dir = tempdir().unwrap();
        let mut store = TrialStore::open(dir.path().join("r.jsonl")).unwrap();
        let mut strategy = TpeSearch::new(space());

        let best = SearchLoop::new(4)
            .optimize(&mut strategy, quadratic, &mut store)
            .unwrap();

        assert_eq!(store.len(), 4);
        assert!(best.is_some());
    }

    #[test]
    fn zero_budget_returns_persisted_best_without_new_trials() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.jsonl");

        {
            let mut store = TrialStore::open(&path).unwrap();
            let mut strategy = TpeSearch::new(space());
            SearchLoop::new(3)
                .optimize(&mut strategy, quadratic, &mut store)
                .unwrap();
        }

        let mut store = TrialStore::open(&path).unwrap();
        let persisted_best = store
            .best(ObjectiveDirection::Minimize)
            .cloned()
            .unwrap();

        let mut strategy = TpeSearch::new(space());
        let best = SearchLoop::new(0)
            .optimize(&mut strategy, quadratic, &mut store)
            .unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(best, Some(persisted_best));
    }

    #[test]
    fn all_failures_still_complete_the_budget() {
        let dir = tempdir().unwrap();
        let mut store = TrialStore::open(dir.path().join("r.jsonl")).unwrap();
        let mut strategy = TpeSearch::new(space());

        let failing = |_: &Configuration| -> anyhow::Result<TrialOutcome> {
            Err(anyhow::anyhow!("nan loss"))
        };
        let best = SearchLoop::new(5)
            .optimize(&mut strategy, failing, &mut store)
            .unwrap();

        assert_eq!(store.len(), 5);
        assert!(store.records().iter().all(|r| !r.is_ok()));
        assert!(best.is_none());
    }

    #[test]
    fn second_invocation_is_additive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.jsonl");

        {
            let mut store = TrialStore::open(&path).unwrap();
            let mut strategy = TpeSearch::new(space());
            SearchLoop::new(3)
                .optimize(&mut strategy, quadratic, &mut store)
                .unwrap();
            assert_eq!(store.len(), 3);
        }

        // Fresh process: new strategy, reopened store.
        let mut store = TrialStore::open(&path).unwrap();
        let mut strategy = TpeSearch::new(space());
        SearchLoop::new(2)
            .optimize(&mut strategy, quadratic, &mut store)
            .unwrap();

        assert_eq!(store.len(), 5);
        let numbers: Vec<usize> = store.records().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn history_is_replayed_into_the_strategy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.jsonl");

        {
            let mut store = TrialStore::open(&path).unwrap();
            let mut strategy = TpeSearch::new(space());
            SearchLoop::new(4)
                .optimize(&mut strategy, quadratic, &mut store)
                .unwrap();
        }

        let mut store = TrialStore::open(&path).unwrap();
        let mut strategy = TpeSearch::new(space());
        SearchLoop::new(1)
            .optimize(&mut strategy, quadratic, &mut store)
            .unwrap();

        // 4 replayed + 1 fresh observation.
        assert_eq!(strategy.n_observations(), 5);
    }

    #[test]
    fn best_may_come_from_a_previous_invocation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.jsonl");

        {
            let mut store = TrialStore::open(&path).unwrap();
            let mut strategy = TpeSearch::new(space());
            // Evaluator that scores perfectly in the first invocation.
            let perfect =
                |_: &Configuration| -> anyhow::Result<TrialOutcome> { Ok(TrialOutcome::new(0.0)) };
            SearchLoop::new(1)
                .optimize(&mut strategy, perfect, &mut store)
                .unwrap();
        }

        let mut store = TrialStore::open(&path).unwrap();
        let mut strategy = TpeSearch::new(space());
        // Second invocation can never do better than 0.0.
        let mediocre =
            |_: &Configuration| -> anyhow::Result<TrialOutcome> { Ok(TrialOutcome::new(0.5)) };
        let best = SearchLoop::new(2)
            .optimize(&mut strategy, mediocre, &mut store)
            .unwrap()
            .unwrap();

        assert_eq!(best.loss, Some(0.0));
        assert_eq!(best.number, 0);
    }
}
