use log::debug;
use std::ops::ControlFlow;

use crate::models::{FieldCandidate, Strategy};

/// A single search strategy over some search context `C`.
pub type StrategyFn<C> = fn(&C) -> Vec<FieldCandidate>;

/// An ordered list of strategies; earlier entries take priority.
pub type StrategyChain<C> = Vec<(Strategy, StrategyFn<C>)>;

pub struct CandidateRanker;

impl CandidateRanker {
    /// Order by strategy priority, then by position in the text, then by
    /// closeness to the anchoring label. The sort is stable.
    pub fn rank(mut candidates: Vec<FieldCandidate>) -> Vec<FieldCandidate> {
        candidates.sort_by_key(|c| (c.strategy.priority(), c.position, c.distance_from_anchor));
        candidates
    }

    pub fn top(candidates: Vec<FieldCandidate>) -> Option<FieldCandidate> {
        Self::rank(candidates).into_iter().next()
    }

    /// Run the chain in order and stop at the first strategy that yields
    /// anything.
    pub fn select<C>(chain: &[(Strategy, StrategyFn<C>)], context: &C) -> Option<FieldCandidate> {
        let outcome = chain.iter().try_fold((), |_, (strategy, run)| {
            let candidates = run(context);
            debug!(
                "{:?} ({}) produced {} candidate(s)",
                strategy,
                strategy.field(),
                candidates.len()
            );
            match Self::top(candidates) {
                Some(winner) => ControlFlow::Break(winner),
                None => ControlFlow::Continue(()),
            }
        });

        match outcome {
            ControlFlow::Break(winner) => Some(winner),
            ControlFlow::Continue(()) => None,
        }
    }
}
