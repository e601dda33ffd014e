use crate::distance::DistanceMatrix;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::objective::{insertion_delta, validate_tour};
use crate::selection::Selection;
use crate::solution::Solution;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub trait ConstructionHeuristic {
    fn construct(&self, ctx: &ConstructionContext<'_>, start: usize) -> Result<Solution>;
    fn name(&self) -> &str;
}

/// Read-only inputs shared by every run on one dataset.
///
/// Candidates are kept in ascending index order: every scan below visits them
/// in that order and keeps the first strict minimum, which makes the
/// deterministic heuristics pure functions of (instance, pool, start).
pub struct ConstructionContext<'a> {
    pub instance: &'a Instance,
    pub distances: &'a DistanceMatrix,
    candidates: Vec<usize>,
    in_pool: Vec<bool>,
    target: usize,
}

impl<'a> ConstructionContext<'a> {
    pub fn new(
        instance: &'a Instance,
        distances: &'a DistanceMatrix,
        selection: &Selection,
    ) -> Result<Self> {
        let n = instance.len();
        if distances.size() != n {
            return Err(Error::invalid_argument(format!(
                "distance matrix covers {} points but the instance has {}",
                distances.size(),
                n
            )));
        }

        let mut candidates = selection.nodes().to_vec();
        validate_tour(&candidates, n)?;
        candidates.sort_unstable();

        let mut in_pool = vec![false; n];
        for &c in &candidates {
            in_pool[c] = true;
        }

        Ok(ConstructionContext {
            instance,
            distances,
            candidates,
            in_pool,
            target: selection.target_size(),
        })
    }

    /// Context over every point of the instance, k = ceil(n/2).
    pub fn full(instance: &'a Instance, distances: &'a DistanceMatrix) -> Result<Self> {
        Self::new(instance, distances, &Selection::full(instance.len()))
    }

    /// Override the tour size.
    pub fn with_target(mut self, target: usize) -> Result<Self> {
        if target > self.candidates.len() {
            return Err(Error::invalid_argument(format!(
                "tour size {} exceeds the {} available candidates",
                target,
                self.candidates.len()
            )));
        }
        self.target = target;
        Ok(self)
    }

    /// Candidate pool in ascending index order
    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }

    /// Size of a complete tour
    pub fn target(&self) -> usize {
        self.target
    }

    /// Rejects a start past the last point of a non-empty instance, then a
    /// start outside the pool unless the pool yields an empty tour.
    pub fn check_start(&self, start: usize) -> Result<()> {
        if !self.instance.is_empty() && start >= self.instance.len() {
            return Err(Error::invalid_argument(format!(
                "start index {} out of range for {} points",
                start,
                self.instance.len()
            )));
        }
        if self.target > 0 && !self.in_pool[start] {
            return Err(Error::invalid_argument(format!(
                "start index {} is not in the candidate pool",
                start
            )));
        }
        Ok(())
    }

    #[inline]
    fn distance(&self, i: usize, j: usize) -> i64 {
        self.distances.get(i, j)
    }

    #[inline]
    fn cost(&self, i: usize) -> i64 {
        self.instance.cost(i)
    }

    fn unvisited<'s>(&'s self, visited: &'s [bool]) -> impl Iterator<Item = usize> + 's {
        self.candidates.iter().copied().filter(move |&c| !visited[c])
    }

    fn finish(&self, tour: Vec<usize>, algorithm: &str, started: Instant) -> Solution {
        let mut solution = Solution::from_tour(self.instance, self.distances, tour, algorithm);
        solution.computation_time = started.elapsed().as_secs_f64();
        solution
    }
}

/// One candidate insertion: put `node` at `position` of the tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    pub node: usize,
    pub position: usize,
    /// Objective change caused by the insertion
    pub delta: i64,
}

impl Insertion {
    fn improves_on(&self, best: Option<Insertion>) -> bool {
        best.map_or(true, |b| self.delta < b.delta)
    }
}

/// Cheapest (candidate, edge) pair over every edge of a closed partial tour.
///
/// Edge `i` joins `tour[i]` to `tour[(i + 1) % m]`, so the closing edge is
/// scanned last; inserting on edge `i` puts the candidate at position `i + 1`.
/// Returns `None` when no unvisited candidate is left or the tour is empty.
pub fn cheapest_insertion(
    ctx: &ConstructionContext<'_>,
    tour: &[usize],
    visited: &[bool],
) -> Option<Insertion> {
    let m = tour.len();
    if m == 0 {
        return None;
    }

    let mut best: Option<Insertion> = None;
    for node in ctx.unvisited(visited) {
        for i in 0..m {
            let prev = tour[i];
            let next = tour[(i + 1) % m];
            let candidate = Insertion {
                node,
                position: i + 1,
                delta: insertion_delta(ctx.distances, ctx.instance, prev, node, next),
            };
            if candidate.improves_on(best) {
                best = Some(candidate);
            }
        }
    }
    best
}

fn start_tour(ctx: &ConstructionContext<'_>, start: usize) -> (Vec<usize>, Vec<bool>) {
    let mut visited = vec![false; ctx.instance.len()];
    visited[start] = true;
    let mut tour = Vec::with_capacity(ctx.target());
    tour.push(start);
    (tour, visited)
}

/// Random Solution
///
/// Shuffles the candidate pool and keeps the first k points. The start index
/// is validated but does not influence the tour.
pub struct RandomHeuristic {
    pub seed: Option<u64>,
}

impl RandomHeuristic {
    /// Draws from OS entropy on every call.
    pub fn new() -> Self {
        RandomHeuristic { seed: None }
    }

    pub fn with_seed(seed: u64) -> Self {
        RandomHeuristic { seed: Some(seed) }
    }
}

impl Default for RandomHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for RandomHeuristic {
    fn construct(&self, ctx: &ConstructionContext<'_>, start: usize) -> Result<Solution> {
        let started = Instant::now();
        ctx.check_start(start)?;
        if ctx.target() == 0 {
            return Ok(Solution::empty(self.name()));
        }

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut tour = ctx.candidates().to_vec();
        tour.shuffle(&mut rng);
        tour.truncate(ctx.target());

        Ok(ctx.finish(tour, self.name(), started))
    }

    fn name(&self) -> &str {
        "Random"
    }
}

/// Nearest Neighbor, appending at the tail
///
/// Grows the tour from its last point only: the next point is the unvisited
/// candidate minimizing `d(tail, c) + cost(c)`. Earlier placements are never
/// revisited.
pub struct NearestNeighborAppend;

impl ConstructionHeuristic for NearestNeighborAppend {
    fn construct(&self, ctx: &ConstructionContext<'_>, start: usize) -> Result<Solution> {
        let started = Instant::now();
        ctx.check_start(start)?;
        if ctx.target() == 0 {
            return Ok(Solution::empty(self.name()));
        }

        let (mut tour, mut visited) = start_tour(ctx, start);

        while tour.len() < ctx.target() {
            let tail = tour[tour.len() - 1];
            let mut best: Option<(usize, i64)> = None;

            for node in ctx.unvisited(&visited) {
                let score = ctx.distance(tail, node) + ctx.cost(node);
                if best.map_or(true, |(_, s)| score < s) {
                    best = Some((node, score));
                }
            }

            match best {
                Some((next, _)) => {
                    tour.push(next);
                    visited[next] = true;
                }
                None => break,
            }
        }

        Ok(ctx.finish(tour, self.name(), started).with_start(start))
    }

    fn name(&self) -> &str {
        "NN-Append"
    }
}

/// Nearest Neighbor, inserting anywhere
///
/// Every unvisited candidate is tried at every position `0..=m` of the
/// current tour and the pair with the lowest resulting objective wins. The
/// objective of each hypothetical tour is the current objective plus the
/// insertion delta, so a step costs O(candidates × m). Positions 0 and `m`
/// both sit on the closing edge.
pub struct NearestNeighborInsert;

impl ConstructionHeuristic for NearestNeighborInsert {
    fn construct(&self, ctx: &ConstructionContext<'_>, start: usize) -> Result<Solution> {
        let started = Instant::now();
        ctx.check_start(start)?;
        if ctx.target() == 0 {
            return Ok(Solution::empty(self.name()));
        }

        let (mut tour, mut visited) = start_tour(ctx, start);

        while tour.len() < ctx.target() {
            let m = tour.len();
            let mut best: Option<Insertion> = None;

            for node in ctx.unvisited(&visited) {
                for position in 0..=m {
                    let prev = tour[(position + m - 1) % m];
                    let next = tour[position % m];
                    let candidate = Insertion {
                        node,
                        position,
                        delta: insertion_delta(ctx.distances, ctx.instance, prev, node, next),
                    };
                    if candidate.improves_on(best) {
                        best = Some(candidate);
                    }
                }
            }

            match best {
                Some(ins) => {
                    tour.insert(ins.position, ins.node);
                    visited[ins.node] = true;
                }
                None => break,
            }
        }

        Ok(ctx.finish(tour, self.name(), started).with_start(start))
    }

    fn name(&self) -> &str {
        "NN-Insert"
    }
}

/// Greedy Cycle
///
/// Pairs the start with the candidate minimizing
/// `d(start, c) + cost(start) + cost(c)` (the connecting edge counted once),
/// then repeatedly applies [`cheapest_insertion`] until the tour is complete.
pub struct GreedyCycle;

impl GreedyCycle {
    fn best_partner(ctx: &ConstructionContext<'_>, start: usize, visited: &[bool]) -> Option<usize> {
        let mut best: Option<(usize, i64)> = None;
        for node in ctx.unvisited(visited) {
            let score = ctx.distance(start, node) + ctx.cost(start) + ctx.cost(node);
            if best.map_or(true, |(_, s)| score < s) {
                best = Some((node, score));
            }
        }
        best.map(|(node, _)| node)
    }
}

impl ConstructionHeuristic for GreedyCycle {
    fn construct(&self, ctx: &ConstructionContext<'_>, start: usize) -> Result<Solution> {
        let started = Instant::now();
        ctx.check_start(start)?;
        if ctx.target() == 0 {
            return Ok(Solution::empty(self.name()));
        }

        let (mut tour, mut visited) = start_tour(ctx, start);

        if ctx.target() >= 2 {
            if let Some(partner) = Self::best_partner(ctx, start, &visited) {
                tour.push(partner);
                visited[partner] = true;
            }
        }

        while tour.len() < ctx.target() {
            match cheapest_insertion(ctx, &tour, &visited) {
                Some(ins) => {
                    tour.insert(ins.position, ins.node);
                    visited[ins.node] = true;
                }
                None => break,
            }
        }

        Ok(ctx.finish(tour, self.name(), started).with_start(start))
    }

    fn name(&self) -> &str {
        "GreedyCycle"
    }
}

/// The construction heuristics known to the experiment harness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeuristicKind {
    Random,
    NearestNeighborAppend,
    NearestNeighborInsert,
    GreedyCycle,
}

impl HeuristicKind {
    pub fn all() -> Vec<HeuristicKind> {
        vec![
            HeuristicKind::Random,
            HeuristicKind::NearestNeighborAppend,
            HeuristicKind::NearestNeighborInsert,
            HeuristicKind::GreedyCycle,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            HeuristicKind::Random => "Random",
            HeuristicKind::NearestNeighborAppend => "NN-Append",
            HeuristicKind::NearestNeighborInsert => "NN-Insert",
            HeuristicKind::GreedyCycle => "GreedyCycle",
        }
    }

    /// Label used in tables and plots
    pub fn label(&self) -> &'static str {
        match self {
            HeuristicKind::Random => "Random Search",
            HeuristicKind::NearestNeighborAppend => "Nearest Neighbor End",
            HeuristicKind::NearestNeighborInsert => "Nearest Neighbor Flexible",
            HeuristicKind::GreedyCycle => "Greedy Cycle",
        }
    }

    pub fn is_random(&self) -> bool {
        matches!(self, HeuristicKind::Random)
    }

    /// Instantiate the heuristic; `seed` only matters for [`HeuristicKind::Random`].
    pub fn build(&self, seed: Option<u64>) -> Box<dyn ConstructionHeuristic + Send + Sync> {
        match self {
            HeuristicKind::Random => Box::new(RandomHeuristic { seed }),
            HeuristicKind::NearestNeighborAppend => Box::new(NearestNeighborAppend),
            HeuristicKind::NearestNeighborInsert => Box::new(NearestNeighborInsert),
            HeuristicKind::GreedyCycle => Box::new(GreedyCycle),
        }
    }
}

impl std::fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::evaluate;
    use crate::selection::NodeSelector;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn create_test_instance() -> (Instance, DistanceMatrix) {
        let instance = Instance::new(
            "test",
            &[
                (0, 0, 0),
                (1, 0, 0),
                (5, 0, 0),
                (2, 0, 100),
                (10, 10, 1),
                (0, 3, 2),
                (7, 1, 0),
            ],
        );
        let distances = DistanceMatrix::from_instance(&instance);
        (instance, distances)
    }

    fn deterministic() -> Vec<Box<dyn ConstructionHeuristic + Send + Sync>> {
        vec![
            Box::new(NearestNeighborAppend),
            Box::new(NearestNeighborInsert),
            Box::new(GreedyCycle),
        ]
    }

    fn distinct(tour: &[usize]) -> bool {
        tour.iter().copied().collect::<HashSet<_>>().len() == tour.len()
    }

    #[test]
    fn test_nearest_neighbor_append() {
        let (instance, distances) = create_test_instance();
        let ctx = ConstructionContext::full(&instance, &distances).unwrap();
        let solution = NearestNeighborAppend.construct(&ctx, 0).unwrap();

        assert_eq!(solution.tour.len(), 4);
        assert_eq!(solution.tour[0], 0);
        assert_eq!(solution.tour[1], 1);
        assert_eq!(solution.start, Some(0));
        assert_eq!(solution.objective, evaluate(&solution.tour, &distances, &instance));
    }

    #[test]
    fn test_append_tie_breaks_on_lowest_index() {
        let instance = Instance::new("ties", &[(0, 0, 0), (0, 5, 0), (5, 0, 0), (-5, 0, 0)]);
        let distances = DistanceMatrix::from_instance(&instance);
        let ctx = ConstructionContext::full(&instance, &distances).unwrap();

        let solution = NearestNeighborAppend.construct(&ctx, 0).unwrap();
        assert_eq!(solution.tour, vec![0, 1]);
    }

    #[test]
    fn test_greedy_pair_counts_edge_once() {
        // From 0: partner 1 scores d + costs = 10 + 15, partner 2 scores 20 + 0.
        // A doubled edge would flip the choice to 1.
        let instance = Instance::new("pair", &[(0, 0, 0), (10, 0, 15), (20, 0, 0)]);
        let distances = DistanceMatrix::from_instance(&instance);
        let ctx = ConstructionContext::full(&instance, &distances).unwrap();

        let greedy = GreedyCycle.construct(&ctx, 0).unwrap();
        assert_eq!(greedy.tour, vec![0, 2]);

        // the insertion variant compares real two-point cycles: 35 vs 40
        // (position 0 wins the tie with the closing edge, so 1 lands first)
        let insert = NearestNeighborInsert.construct(&ctx, 0).unwrap();
        assert_eq!(insert.tour, vec![1, 0]);
        assert_eq!(insert.objective, 35);
    }

    #[test]
    fn test_insert_uses_every_position() {
        let (instance, distances) = create_test_instance();
        let ctx = ConstructionContext::full(&instance, &distances).unwrap();
        let solution = NearestNeighborInsert.construct(&ctx, 0).unwrap();

        assert_eq!(solution.tour.len(), 4);
        assert!(distinct(&solution.tour));
        assert!(solution.tour.contains(&0));
        assert_eq!(solution.objective, evaluate(&solution.tour, &distances, &instance));
    }

    #[test]
    fn test_insert_matches_full_recomputation() {
        let (instance, distances) = create_test_instance();
        let ctx = ConstructionContext::full(&instance, &distances).unwrap();

        for start in 0..instance.len() {
            // brute force: rebuild every hypothetical tour and evaluate it from scratch
            let mut tour = vec![start];
            let mut visited = vec![false; instance.len()];
            visited[start] = true;
            while tour.len() < ctx.target() {
                let mut best: Option<(i64, usize, usize)> = None;
                for node in 0..instance.len() {
                    if visited[node] {
                        continue;
                    }
                    for pos in 0..=tour.len() {
                        let mut candidate = tour.clone();
                        candidate.insert(pos, node);
                        let score = evaluate(&candidate, &distances, &instance);
                        if best.map_or(true, |(s, _, _)| score < s) {
                            best = Some((score, node, pos));
                        }
                    }
                }
                let (_, node, pos) = best.unwrap();
                tour.insert(pos, node);
                visited[node] = true;
            }

            let solution = NearestNeighborInsert.construct(&ctx, start).unwrap();
            assert_eq!(solution.tour, tour, "start {}", start);
        }
    }

    #[test]
    fn test_greedy_incremental_delta() {
        let (instance, distances) = create_test_instance();
        let ctx = ConstructionContext::full(&instance, &distances).unwrap();

        for start in 0..instance.len() {
            let expected = GreedyCycle.construct(&ctx, start).unwrap();

            let mut visited = vec![false; instance.len()];
            visited[start] = true;
            let partner = GreedyCycle::best_partner(&ctx, start, &visited).unwrap();
            visited[partner] = true;
            let mut tour = vec![start, partner];
            let mut objective = evaluate(&tour, &distances, &instance);

            while tour.len() < ctx.target() {
                let ins = cheapest_insertion(&ctx, &tour, &visited).unwrap();
                tour.insert(ins.position, ins.node);
                visited[ins.node] = true;

                let recomputed = evaluate(&tour, &distances, &instance);
                assert_eq!(recomputed - objective, ins.delta);
                objective = recomputed;
            }

            assert_eq!(tour, expected.tour);
            assert_eq!(objective, expected.objective);
        }
    }

    #[test]
    fn test_random_respects_pool() {
        let (instance, distances) = create_test_instance();
        let ctx = ConstructionContext::full(&instance, &distances).unwrap();

        let solution = RandomHeuristic::with_seed(3).construct(&ctx, 0).unwrap();
        assert_eq!(solution.tour.len(), 4);
        assert!(distinct(&solution.tour));

        let again = RandomHeuristic::with_seed(3).construct(&ctx, 0).unwrap();
        assert_eq!(solution.tour, again.tour);

        let unseeded = RandomHeuristic::new().construct(&ctx, 0).unwrap();
        assert_eq!(unseeded.tour.len(), 4);
    }

    #[test]
    fn test_selected_pool_is_ordered_not_extended() {
        let (instance, distances) = create_test_instance();
        let mut selector = NodeSelector::seeded(42);
        let selection = Selection::sample(instance.len(), &mut selector);
        let ctx = ConstructionContext::new(&instance, &distances, &selection).unwrap();
        let pool: HashSet<usize> = selection.nodes().iter().copied().collect();

        for heuristic in deterministic() {
            for &start in selection.nodes() {
                let solution = heuristic.construct(&ctx, start).unwrap();
                let used: HashSet<usize> = solution.tour.iter().copied().collect();
                assert_eq!(used, pool, "{}", heuristic.name());
            }
        }
    }

    #[test]
    fn test_invalid_start() {
        let (instance, distances) = create_test_instance();
        let ctx = ConstructionContext::full(&instance, &distances).unwrap();

        for heuristic in deterministic() {
            let err = heuristic.construct(&ctx, 99).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
        assert!(RandomHeuristic::new().construct(&ctx, 7).is_err());

        let selection = Selection::external(vec![1, 2], instance.len()).unwrap();
        let ctx = ConstructionContext::new(&instance, &distances, &selection).unwrap();
        assert!(GreedyCycle.construct(&ctx, 0).is_err());
    }

    #[test]
    fn test_out_of_range_start_on_empty_pool() {
        let (instance, distances) = create_test_instance();
        let selection = Selection::external(vec![], instance.len()).unwrap();
        let ctx = ConstructionContext::new(&instance, &distances, &selection).unwrap();
        assert_eq!(ctx.target(), 0);

        for kind in HeuristicKind::all() {
            let err = kind.build(Some(1)).construct(&ctx, 999).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{}", kind);

            let solution = kind.build(Some(1)).construct(&ctx, 0).unwrap();
            assert!(solution.is_empty());
        }
    }

    #[test]
    fn test_empty_and_single_point() {
        let empty = Instance::new("empty", &[]);
        let empty_dm = DistanceMatrix::from_instance(&empty);
        let ctx = ConstructionContext::full(&empty, &empty_dm).unwrap();
        for kind in HeuristicKind::all() {
            let solution = kind.build(Some(1)).construct(&ctx, 0).unwrap();
            assert!(solution.is_empty());
            assert_eq!(solution.objective, 0);
        }

        let single = Instance::new("single", &[(4, 4, 9)]);
        let single_dm = DistanceMatrix::from_instance(&single);
        let ctx = ConstructionContext::full(&single, &single_dm).unwrap();
        for kind in HeuristicKind::all() {
            let solution = kind.build(Some(1)).construct(&ctx, 0).unwrap();
            assert_eq!(solution.tour, vec![0]);
            assert_eq!(solution.objective, 9);
        }
    }

    #[test]
    fn test_with_target() {
        let (instance, distances) = create_test_instance();
        let ctx = ConstructionContext::full(&instance, &distances)
            .unwrap()
            .with_target(6)
            .unwrap();
        let solution = GreedyCycle.construct(&ctx, 3).unwrap();
        assert_eq!(solution.tour.len(), 6);

        let too_big = ConstructionContext::full(&instance, &distances).unwrap().with_target(8);
        assert!(too_big.is_err());
    }

    #[test]
    fn test_mismatched_matrix() {
        let (instance, _) = create_test_instance();
        let other = DistanceMatrix::from_instance(&Instance::new("other", &[(0, 0, 0)]));
        assert!(ConstructionContext::full(&instance, &other).is_err());
    }

    proptest! {
        #[test]
        fn prop_complete_distinct_and_deterministic(
            points in prop::collection::vec((-500i64..500, -500i64..500, 0i64..300), 1..24),
            start_seed in 0usize..24,
        ) {
            let instance = Instance::new("prop", &points);
            let distances = DistanceMatrix::from_instance(&instance);
            let ctx = ConstructionContext::full(&instance, &distances).unwrap();
            let start = start_seed % instance.len();
            let k = instance.len().div_ceil(2);

            for kind in HeuristicKind::all() {
                let heuristic = kind.build(Some(11));
                let first = heuristic.construct(&ctx, start).unwrap();
                prop_assert_eq!(first.tour.len(), k);
                prop_assert!(distinct(&first.tour));
                prop_assert_eq!(first.objective, evaluate(&first.tour, &distances, &instance));

                if !kind.is_random() {
                    prop_assert!(first.tour.contains(&start));
                    let second = heuristic.construct(&ctx, start).unwrap();
                    prop_assert_eq!(&first.tour, &second.tour);
                    prop_assert_eq!(first.objective, second.objective);
                }
            }
        }
    }
}
