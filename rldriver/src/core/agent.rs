use crate::core::action::Action;
use crate::core::state::{RLState, StateKey};
use helpers::general::round_to;
use racesim::core::driver::DriverPars;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const EXPLORATION_DECAY: f64 = 0.99;
pub const MIN_EXPLORATION_RATE: f64 = 0.05;
const TRAINED_AFTER_RACES: u32 = 10;
const BASE_SKILL: f64 = 0.7;
const MAX_SKILL_GAIN: f64 = 0.25;

/// * `name` - Agent name
/// * `learning_rate` - Step size alpha of the Q update
/// * `discount_factor` - Discount gamma of future rewards
/// * `exploration_rate` - Initial epsilon of the epsilon-greedy policy
/// * `seed` - Seed of the random number generator, drawn from OS entropy if not set
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AgentPars {
    pub name: String,
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub seed: Option<u64>,
}

impl Default for AgentPars {
    fn default() -> Self {
        AgentPars {
            name: "AI Driver".to_owned(),
            learning_rate: 0.1,
            discount_factor: 0.95,
            exploration_rate: 0.2,
            seed: None,
        }
    }
}

/// Observed consequences of one action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    pub position_gained: bool,
    pub position_lost: bool,
    pub faster_than_average: bool,
    pub incident: bool,
    pub dnf: bool,
    /// Final classification if the race ended with this step.
    pub final_position: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaceOutcome {
    pub final_position: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LearningRecord {
    pub race: u32,
    pub position: u32,
    pub q_table_size: usize,
    pub exploration_rate: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LearnedPreferences {
    pub preferred_tire_strategy: String,
    pub preferred_pit_timing: String,
    pub aggression_level: f64,
}

impl Default for LearnedPreferences {
    fn default() -> Self {
        LearnedPreferences {
            preferred_tire_strategy: "balanced".to_owned(),
            preferred_pit_timing: "mid_race".to_owned(),
            aggression_level: 0.5,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AgentStatistics {
    pub name: String,
    pub races_completed: u32,
    pub total_wins: u32,
    pub total_podiums: u32,
    pub win_rate: f64,
    pub podium_rate: f64,
    pub avg_finish_position: f64,
    pub q_table_size: usize,
    pub exploration_rate: f64,
    pub learned_preferences: LearnedPreferences,
    pub is_trained: bool,
}

/// RlDriver is a tabular Q-learning agent that picks one strategic action per lap.
#[derive(Debug, Clone)]
pub struct RlDriver {
    pub name: String,
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub(crate) q_table: HashMap<(StateKey, Action), f64>,
    pub races_completed: u32,
    pub total_wins: u32,
    pub total_podiums: u32,
    pub avg_finish_position: f64,
    pub learning_history: Vec<LearningRecord>,
    pub learned_preferences: LearnedPreferences,
    rng: ChaCha8Rng,
}

impl RlDriver {
    pub fn new(pars: &AgentPars) -> RlDriver {
        RlDriver {
            name: pars.name.to_owned(),
            learning_rate: pars.learning_rate,
            discount_factor: pars.discount_factor,
            exploration_rate: pars.exploration_rate,
            q_table: HashMap::new(),
            races_completed: 0,
            total_wins: 0,
            total_podiums: 0,
            avg_finish_position: 0.0,
            learning_history: Vec::new(),
            learned_preferences: LearnedPreferences::default(),
            rng: seeded_rng(pars.seed),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Q-TABLE -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// q_value returns the stored value of the pair, 0.0 if it was never visited.
    pub fn q_value(&self, key: &StateKey, action: Action) -> f64 {
        self.q_table
            .get(&(key.to_owned(), action))
            .copied()
            .unwrap_or(0.0)
    }

    fn q_values(&self, key: &StateKey) -> Vec<f64> {
        Action::ALL
            .iter()
            .map(|&action| self.q_value(key, action))
            .collect()
    }

    pub fn max_q(&self, key: &StateKey) -> f64 {
        helpers::general::max(&self.q_values(key))
    }

    pub fn q_table_len(&self) -> usize {
        self.q_table.len()
    }

    pub fn q_entries(&self) -> impl Iterator<Item = (&StateKey, Action, f64)> + '_ {
        self.q_table
            .iter()
            .map(|((key, action), &q)| (key, *action, q))
    }

    pub fn set_q_value(&mut self, key: StateKey, action: Action, q: f64) {
        self.q_table.insert((key, action), q);
    }

    fn greedy_action(&mut self, key: &StateKey) -> Action {
        let q_values = self.q_values(key);
        let q_max = helpers::general::max(&q_values);
        let best: Vec<Action> = Action::ALL
            .iter()
            .zip(q_values.iter())
            .filter(|(_, q)| **q == q_max)
            .map(|(&action, _)| action)
            .collect();

        // ties are broken randomly
        *best.choose(&mut self.rng).unwrap_or(&Action::NormalPace)
    }

    /// choose_action follows the epsilon-greedy policy while training and the greedy policy
    /// otherwise.
    pub fn choose_action(&mut self, state: &RLState, training: bool) -> Action {
        if training && self.rng.gen::<f64>() < self.exploration_rate {
            let idx = self.rng.gen_range(0..Action::ALL.len());
            return Action::ALL[idx];
        }
        self.greedy_action(&state.to_key())
    }

    /// strategy_recommendation returns the best known action without exploration.
    pub fn strategy_recommendation(&mut self, state: &RLState) -> Action {
        self.choose_action(state, false)
    }

    /// update_q_value applies `Q <- Q + alpha * (reward + gamma * max_a' Q(s', a') - Q)`. Without a
    /// next state the transition is terminal and the future value is 0.
    pub fn update_q_value(
        &mut self,
        state: &RLState,
        action: Action,
        reward: f64,
        next_state: Option<&RLState>,
    ) {
        let key = state.to_key();
        let q_cur = self.q_value(&key, action);
        let q_next_max = next_state.map_or(0.0, |next| self.max_q(&next.to_key()));

        let q_new =
            q_cur + self.learning_rate * (reward + self.discount_factor * q_next_max - q_cur);
        self.q_table.insert((key, action), q_new);
    }

    // ---------------------------------------------------------------------------------------------
    // TRAINING ------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// calculate_reward scores an action on the basis of the state it was taken in and its
    /// observed outcome.
    pub fn calculate_reward(state: &RLState, action: Action, outcome: &StepOutcome) -> f64 {
        let mut reward = 0.0;

        if outcome.position_gained {
            reward += 10.0;
        } else if outcome.position_lost {
            reward -= 5.0;
        }

        if outcome.faster_than_average {
            reward += 5.0;
        }

        let cond = state.tire_condition;
        reward += match action {
            Action::ConserveTires if cond < 0.6 => 3.0,
            Action::PushHard if cond > 0.8 => 2.0,
            Action::PitNow if cond < 0.4 => 8.0,
            Action::PitNow if cond > 0.8 => -5.0,
            Action::PushHard
            | Action::ConserveTires
            | Action::PitNow
            | Action::NormalPace
            | Action::DefendPosition
            | Action::AttackAhead => 0.0,
        };

        reward += match state.position {
            1 => 2.0,
            2..=3 => 1.0,
            _ => 0.0,
        };

        // retired cars never complete the race
        if let Some(final_position) = outcome.final_position.filter(|_| !outcome.dnf) {
            reward += 20.0 - final_position as f64;
            reward += match final_position {
                1 => 50.0,
                2..=3 => 20.0,
                _ => 0.0,
            };
        }

        if outcome.incident {
            reward -= 15.0;
        }
        if outcome.dnf {
            reward -= 30.0;
        }

        reward
    }

    /// train_on_race books a finished race: counters, running average of the finishing position,
    /// learning history, and exploration decay.
    pub fn train_on_race(&mut self, outcome: &RaceOutcome) {
        self.races_completed += 1;

        if outcome.final_position == 1 {
            self.total_wins += 1;
        }
        if outcome.final_position <= 3 {
            self.total_podiums += 1;
        }

        self.avg_finish_position += (outcome.final_position as f64 - self.avg_finish_position)
            / self.races_completed as f64;

        self.learning_history.push(LearningRecord {
            race: self.races_completed,
            position: outcome.final_position,
            q_table_size: self.q_table.len(),
            exploration_rate: self.exploration_rate,
        });

        self.exploration_rate =
            (self.exploration_rate * EXPLORATION_DECAY).max(MIN_EXPLORATION_RATE);

        log::info!(
            "{} finished race {} in P{}, exploration rate now {:.3}",
            self.name,
            self.races_completed,
            outcome.final_position,
            self.exploration_rate
        );
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn statistics(&self) -> AgentStatistics {
        let (win_rate, podium_rate) = if self.races_completed > 0 {
            (
                self.total_wins as f64 / self.races_completed as f64 * 100.0,
                self.total_podiums as f64 / self.races_completed as f64 * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        AgentStatistics {
            name: self.name.to_owned(),
            races_completed: self.races_completed,
            total_wins: self.total_wins,
            total_podiums: self.total_podiums,
            win_rate: round_to(win_rate, 2),
            podium_rate: round_to(podium_rate, 2),
            avg_finish_position: round_to(self.avg_finish_position, 2),
            q_table_size: self.q_table.len(),
            exploration_rate: round_to(self.exploration_rate, 3),
            learned_preferences: self.learned_preferences.to_owned(),
            is_trained: self.races_completed >= TRAINED_AFTER_RACES,
        }
    }

    /// to_driver_config converts the agent into simulator driver parameters. The skill grows by
    /// 0.01 per completed race up to 0.95.
    pub fn to_driver_config(&self) -> DriverPars {
        let skill_gain = (self.races_completed as f64 * 0.01).min(MAX_SKILL_GAIN);

        DriverPars {
            name: format!("{} (RL)", self.name),
            skill: round_to(BASE_SKILL + skill_gain, 2),
            aggression: round_to(self.learned_preferences.aggression_level, 2),
        }
    }
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn agent(seed: u64) -> RlDriver {
        RlDriver::new(&AgentPars {
            name: "TestAI".to_owned(),
            seed: Some(seed),
            ..AgentPars::default()
        })
    }

    fn state(lap: u32, position: u32, cond: f64) -> RLState {
        RLState {
            lap,
            total_laps: 50,
            position,
            tire_age: 15,
            tire_condition: cond,
            gap_to_leader: 5.0,
            weather: "dry".to_owned(),
        }
    }

    #[test]
    fn new_agent_is_untrained() {
        let agent = agent(1);
        assert_eq!(agent.name, "TestAI");
        assert_relative_eq!(agent.learning_rate, 0.1);
        assert_eq!(agent.races_completed, 0);
        assert_eq!(agent.q_table_len(), 0);
        assert_relative_eq!(agent.q_value(&state(10, 5, 0.7).to_key(), Action::PitNow), 0.0);
    }

    #[test]
    fn q_update_terminal_and_bootstrapped() {
        let mut agent = agent(1);
        let s = state(10, 5, 0.7);
        let s_next = state(11, 4, 0.65);

        agent.set_q_value(s_next.to_key(), Action::AttackAhead, 4.0);
        agent.set_q_value(s.to_key(), Action::PushHard, 1.0);

        agent.update_q_value(&s, Action::PushHard, 10.0, Some(&s_next));
        let expected = 1.0 + 0.1 * (10.0 + 0.95 * 4.0 - 1.0);
        assert_relative_eq!(agent.q_value(&s.to_key(), Action::PushHard), expected);

        agent.update_q_value(&s, Action::NormalPace, -5.0, None);
        assert_relative_eq!(agent.q_value(&s.to_key(), Action::NormalPace), -0.5);
        assert_eq!(agent.q_table_len(), 3);
    }

    #[test]
    fn greedy_choice_follows_q_table() {
        let mut agent = agent(2);
        let s = state(10, 5, 0.7);
        agent.set_q_value(s.to_key(), Action::ConserveTires, 3.0);
        for _ in 0..20 {
            assert_eq!(agent.choose_action(&s, false), Action::ConserveTires);
        }
        assert_eq!(agent.strategy_recommendation(&s), Action::ConserveTires);
    }

    #[test]
    fn ties_are_broken_among_maxima_only() {
        let mut agent = agent(3);
        let s = state(10, 5, 0.7);
        for action in Action::ALL.iter() {
            agent.set_q_value(s.to_key(), *action, -1.0);
        }
        agent.set_q_value(s.to_key(), Action::PitNow, 2.0);
        agent.set_q_value(s.to_key(), Action::AttackAhead, 2.0);

        for _ in 0..50 {
            let action = agent.choose_action(&s, false);
            assert!(action == Action::PitNow || action == Action::AttackAhead);
        }
    }

    #[test]
    fn reward_rubric() {
        let worn = state(20, 5, 0.35);
        let fresh = state(20, 1, 0.9);

        // good pit timing
        let r = RlDriver::calculate_reward(&worn, Action::PitNow, &StepOutcome::default());
        assert_relative_eq!(r, 8.0);

        // premature pit while leading
        let r = RlDriver::calculate_reward(&fresh, Action::PitNow, &StepOutcome::default());
        assert_relative_eq!(r, -5.0 + 2.0);

        // pushing on fresh tires, gaining a position with a fast lap
        let outcome = StepOutcome {
            position_gained: true,
            faster_than_average: true,
            ..StepOutcome::default()
        };
        let r = RlDriver::calculate_reward(&fresh, Action::PushHard, &outcome);
        assert_relative_eq!(r, 10.0 + 5.0 + 2.0 + 2.0);

        // race win
        let outcome = StepOutcome {
            final_position: Some(1),
            ..StepOutcome::default()
        };
        let r = RlDriver::calculate_reward(&fresh, Action::NormalPace, &outcome);
        assert_relative_eq!(r, 2.0 + 19.0 + 50.0);

        // crash out
        let outcome = StepOutcome {
            position_lost: true,
            incident: true,
            dnf: true,
            ..StepOutcome::default()
        };
        let r = RlDriver::calculate_reward(&worn, Action::ConserveTires, &outcome);
        assert_relative_eq!(r, -5.0 + 3.0 - 15.0 - 30.0);

        // crash out while leading the final lap earns no completion reward
        let outcome = StepOutcome {
            incident: true,
            dnf: true,
            final_position: Some(1),
            ..StepOutcome::default()
        };
        let r = RlDriver::calculate_reward(&fresh, Action::NormalPace, &outcome);
        assert_relative_eq!(r, 2.0 - 15.0 - 30.0);
    }

    #[test]
    fn exploration_decays_to_floor() {
        let mut agent = agent(4);
        for k in 1..=300 {
            agent.train_on_race(&RaceOutcome { final_position: 4 });
            let expected = (0.2 * 0.99f64.powi(k)).max(MIN_EXPLORATION_RATE);
            assert_relative_eq!(agent.exploration_rate, expected, epsilon = 1e-12);
        }
        assert_relative_eq!(agent.exploration_rate, 0.05);
    }

    #[test]
    fn statistics_after_races() {
        let mut agent = agent(5);
        let stats = agent.statistics();
        assert_relative_eq!(stats.win_rate, 0.0);
        assert_relative_eq!(stats.podium_rate, 0.0);
        assert!(!stats.is_trained);

        for pos in [1, 3, 8, 4].iter() {
            agent.train_on_race(&RaceOutcome {
                final_position: *pos,
            });
        }
        let stats = agent.statistics();
        assert_eq!(stats.total_wins, 1);
        assert_eq!(stats.total_podiums, 2);
        assert_relative_eq!(stats.win_rate, 25.0);
        assert_relative_eq!(stats.podium_rate, 50.0);
        assert_relative_eq!(stats.avg_finish_position, 4.0);
        assert_eq!(agent.learning_history.len(), 4);
        let positions: Vec<u32> = agent.learning_history.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 3, 8, 4]);
        assert_eq!(agent.learning_history[3].race, 4);
    }

    #[test]
    fn driver_config_grows_with_experience() {
        let mut agent = agent(6);
        let pars = agent.to_driver_config();
        assert_eq!(pars.name, "TestAI (RL)");
        assert_relative_eq!(pars.skill, 0.7);
        assert_relative_eq!(pars.aggression, 0.5);

        agent.races_completed = 40;
        assert_relative_eq!(agent.to_driver_config().skill, 0.95);
        agent.races_completed = 12;
        assert_relative_eq!(agent.to_driver_config().skill, 0.82);
    }
}
