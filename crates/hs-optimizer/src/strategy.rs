//! Search strategies: how the next candidate configuration is chosen.

use hs_types::{Configuration, SpaceError, SweepResult};

use crate::space::SearchSpace;

/// Common trait for all search strategies.
///
/// The search loop drives this sequentially: one `suggest`, one evaluation,
/// one `observe`. Adaptive strategies use the observed (configuration, loss)
/// pairs to bias later suggestions; replaying persisted history through
/// `observe` before the first suggestion is how a resumed campaign keeps its
/// accumulated knowledge.
pub trait SearchStrategy: Send {
    /// Propose the next configuration to evaluate.
    fn suggest(&mut self) -> SweepResult<Configuration>;

    /// Report a completed ok-status trial so adaptive strategies can learn.
    fn observe(&mut self, _config: &Configuration, _loss: f64) {}

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

/// Independent random sampling across the search space.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    space: SearchSpace,
}

impl RandomSearch {
    pub fn new(space: SearchSpace) -> Self {
        Self { space }
    }
}

impl SearchStrategy for RandomSearch {
    fn suggest(&mut self) -> SweepResult<Configuration> {
        if self.space.is_empty() {
            return Err(SpaceError::EmptySpace.into());
        }
        let mut rng = rand::rng();
        Ok(self.space.sample_random(&mut rng))
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_search_respects_bounds() {
        let space = SearchSpace::new()
            .add_uniform("dropout", 0.1, 0.6)
            .unwrap()
            .add_quniform("batch_size", 100.0, 450.0, 5.0)
            .unwrap();
        let mut rs = RandomSearch::new(space.clone());

        for _ in 0..50 {
            let config = rs.suggest().unwrap();
            assert!(space.contains(&config));
        }
    }

    #[test]
    fn empty_space_is_rejected() {
        let mut rs = RandomSearch::new(SearchSpace::new());
        assert!(rs.suggest().is_err());
    }

    #[test]
    fn observe_is_a_no_op_for_random() {
        let space = SearchSpace::new().add_uniform("x", 0.0, 1.0).unwrap();
        let mut rs = RandomSearch::new(space);
        let config = rs.suggest().unwrap();
        rs.observe(&config, 0.1);
        assert_eq!(rs.name(), "random");
    }
}
