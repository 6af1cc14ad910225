//! The generational search loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info};
use rand::seq::{SliceRandom, index};

use crate::compute::ExecutionError;
use crate::schema::{
    Alphabet, Automaton, ConfigError, GenerationRecord, SearchConfig, SearchHistory, SearchPhase,
    SearchProgress, SearchResult, SearchStats, StopReason,
};

use super::crossover::Recombinator;
use super::fitness::{FitnessEvaluator, FitnessScore};
use super::genome::{SearchRng, diversity, population_diversity};
use super::mutation::Mutator;
use super::selection::Selector;

/// Search failures.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid search configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Automaton execution failed: {0}")]
    Execution(#[from] ExecutionError),
}

/// A running evolutionary search.
///
/// Created with a random population; [`advance`](Self::advance) runs one
/// generation at a time until a [`StopReason`] is returned.
pub struct SearchSession {
    config: SearchConfig,
    alphabet: Alphabet,
    evaluator: FitnessEvaluator,
    rng: SearchRng,
    base_state_count: usize,
    population: Vec<Automaton>,
    scores: Vec<FitnessScore>,
    best: Automaton,
    best_fitness: f32,
    best_generation: usize,
    generation: usize,
    stagnation_count: usize,
    restarts: usize,
    total_evaluations: u64,
    phase: SearchPhase,
    stop_reason: Option<StopReason>,
    history: SearchHistory,
    cancelled: Arc<AtomicBool>,
    started: Instant,
}

impl SearchSession {
    /// Create a session with a freshly randomized population.
    pub fn new<S: AsRef<str>>(
        alphabet: Alphabet,
        targets: &[S],
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;

        let mut rng = match config.random_seed {
            Some(seed) => SearchRng::new(seed),
            None => SearchRng::random(),
        };
        let base_state_count = config.population.state_count_for(targets.len());
        let population: Vec<Automaton> = (0..config.population.size)
            .map(|_| {
                rng.random_automaton(
                    base_state_count,
                    &alphabet,
                    config.population.random_initial_state,
                )
            })
            .collect();
        let best = population[0].clone();

        Ok(Self {
            evaluator: FitnessEvaluator::new(targets),
            config,
            alphabet,
            rng,
            base_state_count,
            population,
            scores: Vec::new(),
            best,
            best_fitness: f32::NEG_INFINITY,
            best_generation: 0,
            generation: 0,
            stagnation_count: 0,
            restarts: 0,
            total_evaluations: 0,
            phase: SearchPhase::Running,
            stop_reason: None,
            history: SearchHistory::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
            started: Instant::now(),
        })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current population. After [`advance`](Self::advance) this is the next
    /// generation, not yet evaluated, unless the search terminated.
    pub fn population(&self) -> &[Automaton] {
        &self.population
    }

    /// Scores of the most recently evaluated population.
    pub fn scores(&self) -> &[FitnessScore] {
        &self.scores
    }

    pub fn best(&self) -> &Automaton {
        &self.best
    }

    pub fn best_fitness(&self) -> f32 {
        self.best_fitness
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    /// Run one generation.
    ///
    /// Returns the stop reason once the search has terminated; further calls
    /// return the same reason without doing any work.
    pub fn advance(&mut self) -> Result<Option<StopReason>, SearchError> {
        if let Some(reason) = self.stop_reason {
            return Ok(Some(reason));
        }
        if self.cancelled.load(Ordering::Relaxed) {
            return Ok(Some(self.terminate(StopReason::Cancelled)));
        }

        let scores = self
            .evaluator
            .evaluate_population(&self.population, self.config.parallel_evaluation)?;
        self.total_evaluations += scores.len() as u64;
        self.record_generation(&scores);
        self.scores = scores;

        self.phase = if self.stagnation_count >= self.config.restart.plateau_threshold {
            SearchPhase::Stagnating
        } else {
            SearchPhase::Running
        };

        if let Some(reason) = self.should_stop() {
            return Ok(Some(self.terminate(reason)));
        }

        if self.stagnation_count >= self.config.restart.restart_threshold
            && self.restarts < self.config.restart.max_restarts
        {
            self.partial_restart();
            self.phase = SearchPhase::Restarting;
            return Ok(None);
        }

        self.reproduce();
        Ok(None)
    }

    /// Update the global best and append this generation's record.
    fn record_generation(&mut self, scores: &[FitnessScore]) {
        let mut best_idx = 0;
        for (i, score) in scores.iter().enumerate() {
            if score.raw > scores[best_idx].raw {
                best_idx = i;
            }
        }
        let generation_best = scores.get(best_idx).map_or(0.0, |s| s.raw);

        if generation_best > self.best_fitness {
            self.best = self.population[best_idx].clone();
            self.best_fitness = generation_best;
            self.best_generation = self.generation;
            self.stagnation_count = 0;
            info!(
                "Generation {}: new best fitness {:.4}",
                self.generation, generation_best
            );
        } else {
            self.stagnation_count += 1;
        }

        let avg_fitness =
            scores.iter().map(|s| s.raw).sum::<f32>() / scores.len().max(1) as f32;
        let record = GenerationRecord {
            generation: self.generation,
            best_fitness: self.best_fitness,
            avg_fitness,
            generation_best,
            diversity: population_diversity(&self.population),
        };
        debug!(
            "Generation {}: best={:.4} avg={:.4} diversity={:.3} stagnation={}",
            record.generation,
            record.best_fitness,
            record.avg_fitness,
            record.diversity,
            self.stagnation_count
        );
        self.history.push(&record);
        self.generation += 1;
    }

    /// Check if the search should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.best_fitness > self.config.near_optimal_fitness_threshold {
            return Some(StopReason::NearOptimal);
        }

        if self.restarts >= self.config.restart.max_restarts
            && self.stagnation_count >= self.config.restart.restart_threshold
        {
            return Some(StopReason::RestartsExhausted);
        }

        if self.generation >= self.config.population.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if let Some(limit) = self.config.max_duration_secs
            && self.started.elapsed().as_secs_f64() >= limit
        {
            return Some(StopReason::TimeLimit);
        }

        None
    }

    fn terminate(&mut self, reason: StopReason) -> StopReason {
        info!(
            "Search stopped after {} generations ({:?}), best fitness {:.4}",
            self.generation, reason, self.best_fitness
        );
        self.phase = SearchPhase::Terminated;
        self.stop_reason = Some(reason);
        reason
    }

    /// Replace most of the population, keeping the global best and the top
    /// `keep_fraction` by composite fitness.
    fn partial_restart(&mut self) {
        let size = self.config.population.size;
        let keep = (self.config.restart.keep_fraction * size as f32).floor() as usize;
        let composite: Vec<f32> = self.scores.iter().map(|s| s.composite).collect();

        let mut next = Vec::with_capacity(size);
        next.push(self.best.clone());
        for idx in Selector::rank(&composite, keep) {
            if next.len() >= size {
                break;
            }
            next.push(self.population[idx].clone());
        }
        let kept = next.len();

        let delta = self.config.restart.state_count_delta;
        while next.len() < size {
            let shift = self.rng.below(2 * delta + 1);
            let num_states = (self.base_state_count + shift).saturating_sub(delta).max(1);
            next.push(self.rng.random_automaton(
                num_states,
                &self.alphabet,
                self.config.population.random_initial_state,
            ));
        }

        self.restarts += 1;
        self.stagnation_count = 0;
        self.population = next;
        info!(
            "Partial restart {}/{}: kept {} individuals",
            self.restarts, self.config.restart.max_restarts, kept
        );
    }

    /// Build the next generation from the evaluated one.
    ///
    /// Parents of a pair are distinct individuals unless the rest of the pool
    /// holds only copies of the first one.
    fn reproduce(&mut self) {
        let size = self.config.population.size;
        let composite: Vec<f32> = self.scores.iter().map(|s| s.composite).collect();
        let selection = Selector::new(&self.config.selection).select(
            &mut self.rng,
            &self.population,
            &composite,
        );

        let mut next: Vec<Automaton> = selection
            .elite
            .iter()
            .map(|&i| self.population[i].clone())
            .collect();
        let elite_count = next.len();

        let recombinator = Recombinator::new(&self.config.crossover);
        let mutator = Mutator::new(&self.config.mutation);
        let mut pool = selection.pool;
        let mut cursor = pool.len();

        while next.len() < size && pool.len() >= 2 {
            if cursor + 2 > pool.len() {
                pool.shuffle(self.rng.inner());
                cursor = 0;
            }
            let (first, second) = take_pair(&mut pool, cursor);
            let parent1 = &self.population[first];
            let parent2 = &self.population[second];
            cursor += 2;

            let (child1, child2) = if self.rng.chance(self.config.crossover.crossover_probability)
            {
                recombinator.recombine(&mut self.rng, parent1, parent2)
            } else {
                (parent1.clone(), parent2.clone())
            };

            for (child, parent) in [(child1, parent1), (child2, parent2)] {
                if next.len() >= size {
                    break;
                }
                let child = if self.rng.chance(self.config.mutation.mutation_probability) {
                    let rate = self
                        .config
                        .mutation
                        .adaptive_rate(diversity(&child, parent));
                    mutator.mutate(&mut self.rng, &child, rate)
                } else {
                    child
                };
                next.push(child);
            }
        }

        // Only reachable with a pool too small to pair.
        while next.len() < size {
            next.push(self.best.clone());
        }

        let spread = population_diversity(&next);
        let non_elite = next.len() - elite_count;
        if spread < self.config.diversity.critical_diversity && non_elite > 0 {
            let count = ((non_elite as f32 * self.config.diversity.rescue_fraction).ceil()
                as usize)
                .min(non_elite);
            for i in index::sample(self.rng.inner(), non_elite, count) {
                let idx = elite_count + i;
                let rescued =
                    mutator.mutate(&mut self.rng, &next[idx], self.config.diversity.rescue_rate);
                next[idx] = rescued;
            }
            info!(
                "Diversity {:.3} below {:.3}: mutated {} individuals",
                spread, self.config.diversity.critical_diversity, count
            );
        }

        self.population = next;
    }

    /// Get current progress.
    pub fn progress(&self) -> SearchProgress {
        let last = self.history.last();
        SearchProgress {
            generation: self.generation,
            total_generations: self.config.population.max_generations,
            best_fitness: self.best_fitness.max(0.0),
            best_generation: self.best_generation,
            avg_fitness: last.map_or(0.0, |r| r.avg_fitness),
            generation_best: last.map_or(0.0, |r| r.generation_best),
            diversity: last.map_or(0.0, |r| r.diversity),
            stagnation_count: self.stagnation_count,
            restarts: self.restarts,
            phase: self.phase,
        }
    }

    /// Final result of the search so far.
    ///
    /// A session that has not terminated reports [`StopReason::Cancelled`].
    pub fn result(&self) -> Result<SearchResult, SearchError> {
        let best_fitness = if self.history.is_empty() {
            self.evaluator.fitness(&self.best)?
        } else {
            self.best_fitness
        };
        let elapsed = self.started.elapsed().as_secs_f64();

        Ok(SearchResult {
            best: self.best.clone(),
            best_fitness,
            best_generation: self.best_generation,
            stats: SearchStats {
                generations: self.generation,
                total_evaluations: self.total_evaluations,
                restarts: self.restarts,
                final_avg_fitness: self.history.last().map_or(0.0, |r| r.avg_fitness),
                elapsed_seconds: elapsed,
                evaluations_per_second: self.total_evaluations as f64 / elapsed.max(1e-9),
                stop_reason: self.stop_reason.unwrap_or(StopReason::Cancelled),
            },
            history: self.history.clone(),
        })
    }

    /// Run the search with progress callback.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<SearchResult, SearchError>
    where
        F: FnMut(&SearchProgress),
    {
        loop {
            let stop = self.advance()?;
            callback(&self.progress());
            if stop.is_some() {
                break;
            }
        }
        self.result()
    }

    /// Run the search (blocking).
    pub fn run(&mut self) -> Result<SearchResult, SearchError> {
        self.run_with_callback(|_| {})
    }
}

/// The pair of population indices at `pool[cursor..cursor + 2]`.
///
/// If both slots name the same individual, the second slot is swapped with
/// the next later slot that names a different one.
fn take_pair(pool: &mut [usize], cursor: usize) -> (usize, usize) {
    let first = pool[cursor];
    if pool[cursor + 1] == first
        && let Some(offset) = pool[cursor + 2..].iter().position(|&i| i != first)
    {
        pool.swap(cursor + 1, cursor + 2 + offset);
    }
    (first, pool[cursor + 1])
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::schema::PopulationConfig;

    const TARGETS: [&str; 3] = ["amo", "amas", "ama"];

    fn scenario_config() -> SearchConfig {
        SearchConfig {
            population: PopulationConfig {
                size: 20,
                max_generations: 50,
                state_count: Some(4),
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        }
    }

    fn session(config: SearchConfig) -> SearchSession {
        SearchSession::new(Alphabet::from("amos"), &TARGETS, config).unwrap()
    }

    /// No crossover, mutation, rescue or early stop: copies stay copies.
    fn still_config() -> SearchConfig {
        let mut config = scenario_config();
        config.near_optimal_fitness_threshold = 1.0;
        config.crossover.crossover_probability = 0.0;
        config.mutation.mutation_probability = 0.0;
        config.diversity.critical_diversity = 0.0;
        config
    }

    /// A session whose population is all copies of one individual.
    fn converged(config: SearchConfig) -> (SearchSession, Automaton) {
        let mut session = session(config);
        let individual = session.population[0].clone();
        session.population = vec![individual.clone(); session.population.len()];
        (session, individual)
    }

    #[test]
    fn test_scenario_history_consistent() {
        let mut session = session(scenario_config());
        let result = session.run().unwrap();

        let history = &result.history.best_fitness;
        assert!(!history.is_empty());
        assert!(history.len() <= 50);
        assert_eq!(history.len(), result.stats.generations);
        assert!(history.windows(2).all(|w| w[0] <= w[1]));

        let recomputed = session.evaluator().fitness(&result.best).unwrap();
        assert_eq!(Some(&recomputed), history.last());
        assert_eq!(recomputed, result.best_fitness);
        assert!(result.best.validate().is_ok());
    }

    #[test]
    fn test_same_seed_same_run() {
        let a = session(scenario_config()).run().unwrap();
        let b = session(scenario_config()).run().unwrap();
        assert_eq!(a.history, b.history);
        assert_eq!(a.best, b.best);
        assert_eq!(a.stats.stop_reason, b.stats.stop_reason);
    }

    #[test]
    fn test_elite_carried_unchanged() {
        let mut config = scenario_config();
        config.diversity.critical_diversity = 0.0;
        let mut session = session(config);

        let before = session.population().to_vec();
        assert_eq!(session.advance().unwrap(), None);

        let composite: Vec<f32> = session.scores().iter().map(|s| s.composite).collect();
        let raw: Vec<f32> = session.scores().iter().map(|s| s.raw).collect();
        let elite = Selector::rank(&composite, 2);
        for (slot, &idx) in elite.iter().enumerate() {
            let carried = &session.population()[slot];
            assert_eq!(carried, &before[idx]);
            // Raw fitness is unaffected by the population; the composite
            // score can shift with the diversity bonus.
            assert_eq!(session.evaluator().fitness(carried).unwrap(), raw[idx]);
        }
    }

    #[test]
    fn test_best_survives_restart() {
        let mut config = scenario_config();
        config.population.size = 6;
        config.population.max_generations = 500;
        config.restart.plateau_threshold = 1;
        config.restart.restart_threshold = 1;
        config.restart.max_restarts = 100;
        let mut session = session(config);

        let mut restarted = false;
        while session.advance().unwrap().is_none() {
            if session.phase() == SearchPhase::Restarting {
                assert!(session.population().contains(session.best()));
                assert_eq!(&session.population()[0], session.best());
                restarted = true;
                break;
            }
        }
        assert!(restarted);
    }

    #[test]
    fn test_restarts_exhausted() {
        let mut config = scenario_config();
        config.population.size = 4;
        config.population.max_generations = 1000;
        config.restart.plateau_threshold = 1;
        config.restart.restart_threshold = 2;
        config.restart.max_restarts = 1;
        let result = session(config).run().unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::RestartsExhausted);
        assert_eq!(result.stats.restarts, 1);
    }

    #[test]
    fn test_generation_cap() {
        let mut config = scenario_config();
        config.population.max_generations = 5;
        let mut calls = 0;
        let result = session(config)
            .run_with_callback(|_| calls += 1)
            .unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert_eq!(result.stats.generations, 5);
        assert_eq!(result.stats.total_evaluations, 100);
        assert_eq!(calls, 5);
    }

    #[test]
    fn test_cancellation() {
        let mut session = session(scenario_config());
        let cancel = session.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let result = session.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 0);
        assert!(result.history.is_empty());
        assert_eq!(session.phase(), SearchPhase::Terminated);
    }

    #[test]
    fn test_time_limit() {
        let mut config = scenario_config();
        config.max_duration_secs = Some(1e-9);
        let result = session(config).run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::TimeLimit);
        assert_eq!(result.stats.generations, 1);
    }

    #[test]
    fn test_near_optimal_stops() {
        let targets = ["amo", "amas", "ama", "amamos", "os", "mas", "sos", "moa"];
        let alphabet = Alphabet::from("amos");
        let config = SearchConfig {
            random_seed: Some(7),
            ..Default::default()
        };
        let mut session = SearchSession::new(alphabet.clone(), &targets, config).unwrap();

        // Four states, the default for eight targets; every string ends in 0.
        let transitions: BTreeMap<_, _> = alphabet
            .iter()
            .flat_map(|symbol| (0..4).map(move |state| ((state, symbol), 0)))
            .collect();
        let accept_all = Automaton::new(
            BTreeSet::from([0, 1, 2, 3]),
            alphabet,
            0,
            BTreeSet::from([0]),
            transitions,
        )
        .unwrap();
        let raw = session.evaluator().fitness(&accept_all).unwrap();
        assert!(raw > SearchConfig::default().near_optimal_fitness_threshold);

        session.population[0] = accept_all.clone();
        let result = session.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::NearOptimal);
        assert_eq!(result.stats.generations, 1);
        assert_eq!(result.best, accept_all);
        assert_eq!(result.best_fitness, raw);
    }

    #[test]
    fn test_rescue_mutates_non_elite() {
        let mut config = still_config();
        config.diversity.critical_diversity = 1.0;
        config.diversity.rescue_fraction = 1.0;
        config.diversity.rescue_rate = 1.0;
        config.mutation.any_target_chance = 0.0;
        let (mut session, individual) = converged(config);

        assert_eq!(session.advance().unwrap(), None);

        let elite = session
            .config
            .selection
            .elite_count(session.population().len());
        assert!(elite > 0);
        let (carried, rescued) = session.population().split_at(elite);
        assert!(carried.iter().all(|a| a == &individual));
        assert!(!rescued.is_empty());
        assert!(rescued.iter().all(|a| a != &individual));
    }

    #[test]
    fn test_converged_population_kept_without_rescue() {
        let (mut session, individual) = converged(still_config());
        assert_eq!(session.advance().unwrap(), None);
        assert!(session.population().iter().all(|a| a == &individual));
    }

    #[test]
    fn test_stagnating_phase() {
        let mut config = still_config();
        config.restart.plateau_threshold = 2;
        config.restart.restart_threshold = 5;
        let (mut session, _) = converged(config);

        let mut phases = Vec::new();
        for _ in 0..6 {
            assert_eq!(session.advance().unwrap(), None);
            phases.push((session.progress().stagnation_count, session.phase()));
        }
        assert_eq!(
            phases,
            vec![
                (0, SearchPhase::Running),
                (1, SearchPhase::Running),
                (2, SearchPhase::Stagnating),
                (3, SearchPhase::Stagnating),
                (4, SearchPhase::Stagnating),
                (0, SearchPhase::Restarting),
            ]
        );
    }

    #[test]
    fn test_restart_keeps_top_and_varies_state_count() {
        let mut config = still_config();
        config.restart.plateau_threshold = 1;
        config.restart.restart_threshold = 1;
        config.restart.keep_fraction = 0.2;
        config.restart.state_count_delta = 1;
        let (mut session, individual) = converged(config);

        assert_eq!(session.advance().unwrap(), None);
        assert_eq!(session.advance().unwrap(), None);
        assert_eq!(session.phase(), SearchPhase::Restarting);
        assert_eq!(session.progress().restarts, 1);

        // The global best plus floor(0.2 * 20) top individuals.
        let (carried, fresh) = session.population().split_at(5);
        assert!(carried.iter().all(|a| a == &individual));
        assert_eq!(fresh.len(), 15);
        for automaton in fresh {
            assert!((3..=5).contains(&automaton.state_count()));
            assert!(automaton.validate().is_ok());
        }
    }

    #[test]
    fn test_pairs_prefer_distinct_individuals() {
        let mut pool = vec![3, 3, 3, 5, 1];
        assert_eq!(take_pair(&mut pool, 0), (3, 5));
        assert_eq!(pool, vec![3, 5, 3, 3, 1]);

        let mut copies = vec![2, 2, 2];
        assert_eq!(take_pair(&mut copies, 0), (2, 2));

        let mut tail = vec![0, 1, 4, 4];
        assert_eq!(take_pair(&mut tail, 2), (4, 4));
        assert_eq!(take_pair(&mut tail, 0), (0, 1));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = scenario_config();
        config.population.size = 1;
        let result = SearchSession::new(Alphabet::from("amos"), &TARGETS, config);
        assert!(matches!(
            result,
            Err(SearchError::Config(ConfigError::PopulationTooSmall))
        ));
    }

    #[test]
    fn test_empty_targets() {
        let empty: [&str; 0] = [];
        let mut config = scenario_config();
        config.population.max_generations = 3;
        let mut session = SearchSession::new(Alphabet::from("amos"), &empty, config).unwrap();
        let result = session.run().unwrap();
        assert!(result.history.best_fitness.iter().all(|&f| f == 0.0));
    }
}
