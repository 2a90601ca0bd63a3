use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use rand::prelude::*;

use crate::blackjack::{
    self, Action, DealerHand, Outcome, Player, PlayerState, StateAction, PLAYER_SUMS,
};
use crate::solver::ValueEstimate;

// The starting policy sticks on this sum and above.
const DEFAULT_STICK_SUM: u32 = 20;
// Number of progress lines logged during one training run.
const PROGRESS_STEPS: u64 = 10;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingStats {
    pub episodes: u64,
    pub wins: u64,
    pub draws: u64,
    pub losses: u64,
    pub elapsed: Duration,
}

// State-action pairs of one episode in the order they were first visited.
#[derive(Debug, Default)]
struct Visits {
    pairs: Vec<StateAction>,
    seen: HashSet<StateAction>,
}

// Estimates and policy for a contiguous range of dealer cards. Every state of the
// range is present in the maps from construction on.
#[derive(Clone, Debug)]
pub struct Partition {
    dealer_cards: RangeInclusive<u32>,
    policy: HashMap<PlayerState, Action>,
    action_values: HashMap<StateAction, ValueEstimate>,
    stats: TrainingStats,
}

impl TrainingStats {
    fn record(&mut self, outcome: Outcome) {
        self.episodes += 1;
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Draw => self.draws += 1,
            Outcome::Loss => self.losses += 1,
        }
    }

    // Average return of the exploring-start episodes, not of the learned policy.
    pub fn average_reward(&self) -> f64 {
        if self.episodes == 0 {
            return 0.0;
        }
        (self.wins as f64 - self.losses as f64) / self.episodes as f64
    }
}

impl Visits {
    fn add(&mut self, state: PlayerState, action: Action) {
        let pair = StateAction::new(state, action);
        if self.seen.insert(pair) {
            self.pairs.push(pair);
        }
    }
}

impl Partition {
    pub fn new(dealer_cards: RangeInclusive<u32>) -> Partition {
        let mut policy = HashMap::new();
        let mut action_values = HashMap::new();

        for player_sum in PLAYER_SUMS {
            for usable_ace in [false, true] {
                for dealer_card in dealer_cards.clone() {
                    let state = PlayerState::new(player_sum, usable_ace, dealer_card);
                    for action in [Action::Hit, Action::Stick] {
                        let pair = StateAction::new(state, action);
                        action_values.insert(pair, ValueEstimate::default());
                    }
                    policy.insert(state, Action::from(player_sum < DEFAULT_STICK_SUM));
                }
            }
        }

        Partition {
            dealer_cards,
            policy,
            action_values,
            stats: TrainingStats::default(),
        }
    }

    pub fn dealer_cards(&self) -> &RangeInclusive<u32> {
        &self.dealer_cards
    }

    pub fn upper_bound(&self) -> u32 {
        *self.dealer_cards.end()
    }

    #[cfg(test)]
    pub fn policy(&self) -> &HashMap<PlayerState, Action> {
        &self.policy
    }

    pub fn action(&self, state: &PlayerState) -> Option<Action> {
        self.policy.get(state).copied()
    }

    pub fn estimate(&self, state: PlayerState, action: Action) -> Option<&ValueEstimate> {
        self.action_values.get(&StateAction::new(state, action))
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    fn action_value(&self, state: PlayerState, action: Action) -> f64 {
        self.estimate(state, action).map_or(0.0, |e| e.avg)
    }

    pub fn train<R: Rng + ?Sized>(&mut self, rng: &mut R, iterations: u64) {
        let started = Instant::now();
        let step = (iterations / PROGRESS_STEPS).max(1);
        for i in 1..=iterations {
            self.generate_episode(rng);
            if i % step == 0 {
                log::debug!(
                    "dealer cards {:?}: {}/{} episodes, average reward {:.4}",
                    self.dealer_cards,
                    i,
                    iterations,
                    self.stats.average_reward()
                );
            }
        }
        self.stats.elapsed += started.elapsed();
    }

    // Exploring start: both the starting state and the first action are chosen at
    // random, independent of the current policy.
    pub fn generate_episode<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Outcome {
        let start = PlayerState::random(rng, &self.dealer_cards);
        let first_action = Action::random(rng);
        self.play_episode(start, first_action, &mut || blackjack::draw_card(rng))
    }

    // Plays one episode from the given start and credits every visited pair with the
    // terminal reward. Cards come from `draw`, the dealer's hole card included.
    pub fn play_episode<D: FnMut() -> u32>(
        &mut self,
        start: PlayerState,
        first_action: Action,
        draw: &mut D,
    ) -> Outcome {
        let mut visits = Visits::default();
        let mut player = Player::from_state(&start);
        visits.add(start, first_action);

        if first_action.is_hit() {
            player.add_card(draw());
            while !player.is_bust() && self.policy[&player.state()].is_hit() {
                visits.add(player.state(), Action::Hit);
                player.add_card(draw());
            }
        }

        // The dealer never plays against a bust hand.
        let outcome = if player.is_bust() {
            Outcome::Loss
        } else {
            visits.add(player.state(), Action::Stick);
            let mut dealer = DealerHand::new(start.dealer_card());
            dealer.add_card(draw());
            blackjack::play_dealer(&mut dealer, draw);
            Outcome::showdown(player.value(), &dealer)
        };

        self.evaluate_and_improve(&visits.pairs, outcome.reward());
        self.stats.record(outcome);
        outcome
    }

    // Incremental average per pair, then the greedy action for the pair's state.
    // Hitting has to be strictly better; ties stick. Pairs outside the partition
    // are skipped and never added to the maps.
    pub fn evaluate_and_improve(&mut self, pairs: &[StateAction], reward: f64) {
        for pair in pairs {
            let Some(estimate) = self.action_values.get_mut(pair) else {
                log::warn!("dealer cards {:?}: unknown pair {:?}", self.dealer_cards, pair);
                continue;
            };
            estimate.update(reward);

            let state = pair.state;
            let hit =
                self.action_value(state, Action::Hit) > self.action_value(state, Action::Stick);
            if let Some(action) = self.policy.get_mut(&state) {
                *action = Action::from(hit);
            }
        }
    }
}
