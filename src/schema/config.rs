//! Configuration types for the evolutionary automaton search.

use serde::{Deserialize, Serialize};

/// Top-level search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Elitism and diversity-aware tournament selection.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Recombination settings.
    #[serde(default)]
    pub crossover: CrossoverConfig,
    /// Mutation settings.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Stagnation detection and partial restarts.
    #[serde(default)]
    pub restart: RestartConfig,
    /// Diversity collapse rescue.
    #[serde(default)]
    pub diversity: DiversityConfig,
    /// Stop once the best raw fitness exceeds this value.
    ///
    /// Raw fitness is at most `0.95` minus the complexity penalty, which is
    /// `0.125` at the default state count once there are four or more
    /// targets.
    #[serde(default = "default_near_optimal_fitness_threshold")]
    pub near_optimal_fitness_threshold: f32,
    /// Evaluate fitness on the rayon thread pool.
    #[serde(default = "default_parallel_evaluation")]
    pub parallel_evaluation: bool,
    /// Hard wall-clock limit for a run, in seconds.
    #[serde(default)]
    pub max_duration_secs: Option<f64>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            selection: SelectionConfig::default(),
            crossover: CrossoverConfig::default(),
            mutation: MutationConfig::default(),
            restart: RestartConfig::default(),
            diversity: DiversityConfig::default(),
            near_optimal_fitness_threshold: default_near_optimal_fitness_threshold(),
            parallel_evaluation: default_parallel_evaluation(),
            max_duration_secs: None,
            random_seed: None,
        }
    }
}

fn default_near_optimal_fitness_threshold() -> f32 {
    0.8
}
fn default_parallel_evaluation() -> bool {
    true
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in the population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Maximum number of generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// States per randomly built automaton. When unset, half the number of
    /// target strings (at least 2).
    #[serde(default)]
    pub state_count: Option<usize>,
    /// Pick the initial state at random instead of always using state 0.
    #[serde(default)]
    pub random_initial_state: bool,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            state_count: None,
            random_initial_state: false,
        }
    }
}

impl PopulationConfig {
    /// Number of states for fresh automata given the size of the target sample.
    pub fn state_count_for(&self, target_count: usize) -> usize {
        self.state_count.unwrap_or((target_count / 2).max(2)).max(1)
    }
}

fn default_population_size() -> usize {
    20
}
fn default_max_generations() -> usize {
    50
}

/// Selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Fraction of the population carried over unchanged.
    #[serde(default = "default_elite_ratio")]
    pub elite_ratio: f32,
    /// Minimum diversity a tournament winner needs to every already
    /// selected individual to be admitted outright.
    #[serde(default = "default_diversity_threshold")]
    pub diversity_threshold: f32,
    /// Individuals sampled per tournament.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Size of the parent pool. Defaults to the population size.
    #[serde(default)]
    pub pool_size: Option<usize>,
    /// Chance of admitting a winner that fails the diversity check.
    #[serde(default = "default_fallback_acceptance")]
    pub fallback_acceptance: f32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            elite_ratio: default_elite_ratio(),
            diversity_threshold: default_diversity_threshold(),
            tournament_size: default_tournament_size(),
            pool_size: None,
            fallback_acceptance: default_fallback_acceptance(),
        }
    }
}

impl SelectionConfig {
    /// Number of elite individuals for a population of `population_size`.
    pub fn elite_count(&self, population_size: usize) -> usize {
        if self.elite_ratio <= 0.0 {
            return 0;
        }
        ((self.elite_ratio * population_size as f32).floor() as usize)
            .max(1)
            .min(population_size)
    }
}

fn default_elite_ratio() -> f32 {
    0.1
}
fn default_diversity_threshold() -> f32 {
    0.2
}
fn default_tournament_size() -> usize {
    3
}
fn default_fallback_acceptance() -> f32 {
    0.3
}

/// Recombination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossoverConfig {
    /// Chance that a parent pair is recombined instead of copied.
    #[serde(default = "default_crossover_probability")]
    pub crossover_probability: f32,
    /// Relative weight of one-point crossover.
    #[serde(default = "default_one_point_weight")]
    pub one_point_weight: f32,
    /// Relative weight of uniform crossover.
    #[serde(default = "default_uniform_weight")]
    pub uniform_weight: f32,
    /// Relative weight of state-swap crossover.
    #[serde(default = "default_state_swap_weight")]
    pub state_swap_weight: f32,
    /// Range the per-call uniform exchange probability is drawn from.
    #[serde(default = "default_uniform_exchange_range")]
    pub uniform_exchange_range: (f32, f32),
    /// Chance of swapping the children's final-state sets.
    #[serde(default = "default_final_set_swap_chance")]
    pub final_set_swap_chance: f32,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            crossover_probability: default_crossover_probability(),
            one_point_weight: default_one_point_weight(),
            uniform_weight: default_uniform_weight(),
            state_swap_weight: default_state_swap_weight(),
            uniform_exchange_range: default_uniform_exchange_range(),
            final_set_swap_chance: default_final_set_swap_chance(),
        }
    }
}

fn default_crossover_probability() -> f32 {
    0.7
}
fn default_one_point_weight() -> f32 {
    0.4
}
fn default_uniform_weight() -> f32 {
    0.4
}
fn default_state_swap_weight() -> f32 {
    0.2
}
fn default_uniform_exchange_range() -> (f32, f32) {
    (0.3, 0.7)
}
fn default_final_set_swap_chance() -> f32 {
    0.3
}

/// Mutation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Chance that a child is mutated.
    #[serde(default = "default_mutation_probability")]
    pub mutation_probability: f32,
    /// Lowest adaptive mutation rate.
    #[serde(default = "default_rate_floor")]
    pub rate_floor: f32,
    /// Adaptive rate before subtracting child-parent diversity.
    #[serde(default = "default_rate_ceiling")]
    pub rate_ceiling: f32,
    /// Chance a mutated transition may keep its current target.
    #[serde(default = "default_any_target_chance")]
    pub any_target_chance: f32,
    /// Chance of reassigning the initial state.
    #[serde(default = "default_initial_state_chance")]
    pub initial_state_chance: f32,
    /// Chance of a final-state toggling pass.
    #[serde(default = "default_final_toggle_chance")]
    pub final_toggle_chance: f32,
    /// Per-state toggle chance during a final-state toggling pass.
    #[serde(default = "default_final_toggle_per_state")]
    pub final_toggle_per_state: f32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            mutation_probability: default_mutation_probability(),
            rate_floor: default_rate_floor(),
            rate_ceiling: default_rate_ceiling(),
            any_target_chance: default_any_target_chance(),
            initial_state_chance: default_initial_state_chance(),
            final_toggle_chance: default_final_toggle_chance(),
            final_toggle_per_state: default_final_toggle_per_state(),
        }
    }
}

impl MutationConfig {
    /// Mutation rate for a child at `parent_diversity` from its parent.
    pub fn adaptive_rate(&self, parent_diversity: f32) -> f32 {
        self.rate_floor.max(self.rate_ceiling - parent_diversity)
    }
}

fn default_mutation_probability() -> f32 {
    0.2
}
fn default_rate_floor() -> f32 {
    0.05
}
fn default_rate_ceiling() -> f32 {
    0.3
}
fn default_any_target_chance() -> f32 {
    0.4
}
fn default_initial_state_chance() -> f32 {
    0.1
}
fn default_final_toggle_chance() -> f32 {
    0.2
}
fn default_final_toggle_per_state() -> f32 {
    0.3
}

/// Stagnation and restart settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartConfig {
    /// Generations without improvement before the search counts as stagnating.
    #[serde(default = "default_plateau_threshold")]
    pub plateau_threshold: usize,
    /// Generations without improvement before a partial restart.
    #[serde(default = "default_restart_threshold")]
    pub restart_threshold: usize,
    /// Maximum number of partial restarts per run.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: usize,
    /// Fraction of the current population kept through a restart.
    #[serde(default = "default_keep_fraction")]
    pub keep_fraction: f32,
    /// Maximum change to the state count of fresh automata after a restart.
    #[serde(default = "default_state_count_delta")]
    pub state_count_delta: usize,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            plateau_threshold: default_plateau_threshold(),
            restart_threshold: default_restart_threshold(),
            max_restarts: default_max_restarts(),
            keep_fraction: default_keep_fraction(),
            state_count_delta: default_state_count_delta(),
        }
    }
}

fn default_plateau_threshold() -> usize {
    8
}
fn default_restart_threshold() -> usize {
    15
}
fn default_max_restarts() -> usize {
    3
}
fn default_keep_fraction() -> f32 {
    0.2
}
fn default_state_count_delta() -> usize {
    1
}

/// Diversity collapse rescue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityConfig {
    /// Population diversity below which a rescue mutation pass runs.
    #[serde(default = "default_critical_diversity")]
    pub critical_diversity: f32,
    /// Fraction of non-elite individuals mutated by a rescue pass.
    #[serde(default = "default_rescue_fraction")]
    pub rescue_fraction: f32,
    /// Mutation rate used by a rescue pass.
    #[serde(default = "default_rescue_rate")]
    pub rescue_rate: f32,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            critical_diversity: default_critical_diversity(),
            rescue_fraction: default_rescue_fraction(),
            rescue_rate: default_rescue_rate(),
        }
    }
}

fn default_critical_diversity() -> f32 {
    0.1
}
fn default_rescue_fraction() -> f32 {
    0.5
}
fn default_rescue_rate() -> f32 {
    0.5
}

// ============================================================================
// Validation
// ============================================================================

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Maximum generations must be non-zero")]
    NoGenerations,
    #[error("State count must be non-zero")]
    NoStates,
    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f32 },
    #[error("Tournament size must be non-zero")]
    EmptyTournament,
    #[error("Parent pool must hold at least 2 individuals")]
    PoolTooSmall,
    #[error("Selection fallback acceptance must be positive")]
    NoFallbackAcceptance,
    #[error("Crossover strategy weights must be non-negative and not all zero")]
    InvalidStrategyWeights,
    #[error("Invalid range for {name}: min ({min}) > max ({max})")]
    InvalidRange {
        name: &'static str,
        min: f32,
        max: f32,
    },
    #[error("Restart threshold ({restart}) is below plateau threshold ({plateau})")]
    RestartBeforePlateau { plateau: usize, restart: usize },
    #[error("Time limit must be positive")]
    InvalidTimeLimit,
}

impl SearchConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population.size < 2 {
            return Err(ConfigError::PopulationTooSmall);
        }
        if self.population.max_generations == 0 {
            return Err(ConfigError::NoGenerations);
        }
        if self.population.state_count == Some(0) {
            return Err(ConfigError::NoStates);
        }

        let check_probability = |value: f32, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidProbability { name, value })
            }
        };

        check_probability(self.selection.elite_ratio, "elite_ratio")?;
        check_probability(self.selection.diversity_threshold, "diversity_threshold")?;
        check_probability(self.selection.fallback_acceptance, "fallback_acceptance")?;
        check_probability(self.crossover.crossover_probability, "crossover_probability")?;
        check_probability(self.crossover.final_set_swap_chance, "final_set_swap_chance")?;
        check_probability(self.crossover.uniform_exchange_range.0, "uniform_exchange_range")?;
        check_probability(self.crossover.uniform_exchange_range.1, "uniform_exchange_range")?;
        check_probability(self.mutation.mutation_probability, "mutation_probability")?;
        check_probability(self.mutation.rate_floor, "rate_floor")?;
        check_probability(self.mutation.rate_ceiling, "rate_ceiling")?;
        check_probability(self.mutation.any_target_chance, "any_target_chance")?;
        check_probability(self.mutation.initial_state_chance, "initial_state_chance")?;
        check_probability(self.mutation.final_toggle_chance, "final_toggle_chance")?;
        check_probability(self.mutation.final_toggle_per_state, "final_toggle_per_state")?;
        check_probability(self.restart.keep_fraction, "keep_fraction")?;
        check_probability(self.diversity.critical_diversity, "critical_diversity")?;
        check_probability(self.diversity.rescue_fraction, "rescue_fraction")?;
        check_probability(self.diversity.rescue_rate, "rescue_rate")?;

        if self.selection.tournament_size == 0 {
            return Err(ConfigError::EmptyTournament);
        }
        if self.selection.pool_size.is_some_and(|size| size < 2) {
            return Err(ConfigError::PoolTooSmall);
        }
        if self.selection.fallback_acceptance <= 0.0 {
            return Err(ConfigError::NoFallbackAcceptance);
        }

        let weights = [
            self.crossover.one_point_weight,
            self.crossover.uniform_weight,
            self.crossover.state_swap_weight,
        ];
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) || weights.iter().sum::<f32>() <= 0.0
        {
            return Err(ConfigError::InvalidStrategyWeights);
        }

        let check_range = |range: (f32, f32), name: &'static str| {
            if range.0 > range.1 {
                Err(ConfigError::InvalidRange {
                    name,
                    min: range.0,
                    max: range.1,
                })
            } else {
                Ok(())
            }
        };

        check_range(
            self.crossover.uniform_exchange_range,
            "uniform_exchange_range",
        )?;
        check_range(
            (self.mutation.rate_floor, self.mutation.rate_ceiling),
            "mutation rate",
        )?;

        if self.restart.restart_threshold < self.restart.plateau_threshold {
            return Err(ConfigError::RestartBeforePlateau {
                plateau: self.restart.plateau_threshold,
                restart: self.restart.restart_threshold,
            });
        }

        if self.max_duration_secs.is_some_and(|secs| secs <= 0.0) {
            return Err(ConfigError::InvalidTimeLimit);
        }

        Ok(())
    }
}
