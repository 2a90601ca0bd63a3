pub mod monte_carlo;
pub mod parallel;

use rand::prelude::*;
use rand::rngs::SmallRng;

use crate::blackjack::{self, Action, PlayerState, DEALER_CARDS};

pub use monte_carlo::Partition;
pub use parallel::{train, PolicyTable};

// Episodes generated by every partition.
const DEFAULT_ITERATIONS: u64 = 10_000_000;
// Hands played when comparing the learned policy against the baseline.
const DEFAULT_EVALUATION_HANDS: u64 = 1_000_000;

#[derive(Clone, Debug)]
pub struct Settings {
    pub iterations: u64,
    // Falls back to the number of logical CPUs.
    pub workers: Option<usize>,
    // Falls back to OS entropy.
    pub seed: Option<u64>,
    pub evaluation_hands: u64,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            iterations: DEFAULT_ITERATIONS,
            workers: None,
            seed: None,
            evaluation_hands: DEFAULT_EVALUATION_HANDS,
        }
    }
}

// Running average of the returns observed after a state-action pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ValueEstimate {
    pub avg: f64,
    pub count: u64,
}

impl ValueEstimate {
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        self.avg += (value - self.avg) / self.count as f64;
    }
}

// Generator for policy evaluation. With a seed it starts past the seeds of the
// training partitions, which use `seed + index`.
pub fn evaluation_rng(settings: &Settings) -> SmallRng {
    match settings.seed {
        Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(u64::from(*DEALER_CARDS.end()))),
        None => SmallRng::from_entropy(),
    }
}

// Average reward of the policy over normally dealt hands.
pub fn evaluate<R, P>(rng: &mut R, hands: u64, policy: &P) -> f64
where
    R: Rng + ?Sized,
    P: Fn(&PlayerState) -> Action,
{
    if hands == 0 {
        return 0.0;
    }
    let total: f64 = (0..hands)
        .map(|_| blackjack::play_hand(rng, policy).reward())
        .sum();
    total / hands as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::*;
    use rand::rngs::StdRng;
    use rstest::rstest;

    #[rstest]
    #[case(&[1.0])]
    #[case(&[-1.0, 1.0, 0.0])]
    #[case(&[1.0, 1.0, -1.0, 0.0, -1.0, -1.0, 1.0])]
    #[case(&[0.0, 0.0, 0.0, 0.0])]
    fn incremental_mean(#[case] rewards: &[f64]) {
        let mut estimate = ValueEstimate::default();
        for r in rewards {
            estimate.update(*r);
        }
        let mean = rewards.iter().sum::<f64>() / rewards.len() as f64;
        assert_eq!(estimate.count, rewards.len() as u64);
        assert_float_eq!(estimate.avg, mean, abs <= 1e-12);
    }

    #[test]
    fn incremental_mean_long_sequence() {
        let rng = &mut StdRng::seed_from_u64(5);
        let rewards: Vec<f64> = (0..100_000)
            .map(|_| rng.gen_range(-1..=1) as f64)
            .collect();
        let mut estimate = ValueEstimate::default();
        rewards.iter().for_each(|r| estimate.update(*r));
        let mean = rewards.iter().sum::<f64>() / rewards.len() as f64;
        assert_float_eq!(estimate.avg, mean, abs <= 1e-9);
    }

    #[test]
    fn evaluate_baseline() {
        let rng = &mut StdRng::seed_from_u64(17);
        let returns = evaluate(rng, 50_000, &blackjack::stick_at_20);
        assert!(returns < 0.0 && returns > -0.6, "{}", returns);
        assert_eq!(evaluate(rng, 0, &blackjack::stick_at_20), 0.0);
    }

    #[test]
    fn seeded_evaluation_is_reproducible() {
        let settings = Settings {
            seed: Some(99),
            ..Settings::default()
        };
        let first = evaluate(&mut evaluation_rng(&settings), 2_000, &blackjack::stick_at_20);
        let second = evaluate(&mut evaluation_rng(&settings), 2_000, &blackjack::stick_at_20);
        assert_eq!(first, second);

        let draws = |rng: &mut SmallRng| (0..16).map(|_| rng.gen::<u64>()).collect::<Vec<_>>();
        assert_eq!(
            draws(&mut evaluation_rng(&settings)),
            draws(&mut evaluation_rng(&settings))
        );
    }

    #[test]
    fn default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.iterations, DEFAULT_ITERATIONS);
        assert!(settings.workers.is_none());
    }
}
