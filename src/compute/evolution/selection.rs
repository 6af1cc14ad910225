//! Elitism plus diversity-aware tournament selection.

use std::borrow::Borrow;

use rand::seq::index;

use crate::schema::{Automaton, SelectionConfig};

use super::genome::{SearchRng, diversity};

/// Indices chosen by one round of selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Elite indices, best first.
    pub elite: Vec<usize>,
    /// Parent pool. Starts with the elite.
    pub pool: Vec<usize>,
}

/// Picks the elite and a parent pool from a scored population.
pub struct Selector<'a> {
    config: &'a SelectionConfig,
}

impl<'a> Selector<'a> {
    pub fn new(config: &'a SelectionConfig) -> Self {
        Self { config }
    }

    /// Indices of the `count` fittest individuals. Ties keep population order.
    pub fn rank(fitness: &[f32], count: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..fitness.len()).collect();
        order.sort_by(|&a, &b| fitness[b].total_cmp(&fitness[a]));
        order.truncate(count);
        order
    }

    /// Run elitism and tournaments until the pool is full.
    ///
    /// A tournament winner joins the pool when its diversity to every pool
    /// member reaches the threshold, or otherwise with the fallback
    /// acceptance probability.
    pub fn select<A: Borrow<Automaton>>(
        &self,
        rng: &mut SearchRng,
        population: &[A],
        fitness: &[f32],
    ) -> Selection {
        debug_assert_eq!(population.len(), fitness.len());
        let size = population.len();
        if size == 0 {
            return Selection::default();
        }

        let elite = Self::rank(fitness, self.config.elite_count(size));
        let target = self.config.pool_size.unwrap_or(size);
        let mut pool = elite.clone();

        let tournament_size = self.config.tournament_size.clamp(1, size);
        while pool.len() < target {
            let winner = self.tournament(rng, fitness, tournament_size);
            let candidate = population[winner].borrow();

            let diverse = pool.iter().all(|&selected| {
                diversity(candidate, population[selected].borrow())
                    >= self.config.diversity_threshold
            });
            if diverse || rng.chance(self.config.fallback_acceptance) {
                pool.push(winner);
            }
        }

        Selection { elite, pool }
    }

    /// Sample distinct individuals and return the fittest, first on ties.
    fn tournament(&self, rng: &mut SearchRng, fitness: &[f32], size: usize) -> usize {
        let mut best_idx = 0;
        let mut best_fitness = f32::NEG_INFINITY;
        for idx in index::sample(rng.inner(), fitness.len(), size) {
            if fitness[idx] > best_fitness {
                best_fitness = fitness[idx];
                best_idx = idx;
            }
        }
        best_idx
    }
}
