use std::ops::RangeInclusive;
use std::thread;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use rand::prelude::*;
use rand::rngs::SmallRng;

use crate::blackjack::{Action, PlayerState, DEALER_CARDS};
use crate::solver::{Partition, Settings};

// Trained partitions ordered by dealer card.
#[derive(Clone, Debug)]
pub struct PolicyTable {
    partitions: Vec<Partition>,
}

impl PolicyTable {
    pub fn new(partitions: Vec<Partition>) -> PolicyTable {
        PolicyTable { partitions }
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn partition_for(&self, dealer_card: u32) -> Option<&Partition> {
        if !DEALER_CARDS.contains(&dealer_card) {
            return None;
        }
        self.partitions
            .iter()
            .find(|partition| dealer_card <= partition.upper_bound())
    }

    pub fn action(&self, player_sum: u32, usable_ace: bool, dealer_card: u32) -> Option<Action> {
        self.partition_for(dealer_card)?
            .action(&PlayerState::new(player_sum, usable_ace, dealer_card))
    }

    // Learned action for a state met while playing a hand; states outside the
    // learned range stick.
    pub fn decide(&self, state: &PlayerState) -> Action {
        self.action(state.player_sum(), state.usable_ace(), state.dealer_card())
            .unwrap_or_default()
    }
}

// Every partition needs at least one dealer card, so more workers than cards are clamped.
pub fn worker_count(settings: &Settings) -> Result<usize> {
    let workers = settings.workers.unwrap_or_else(num_cpus::get);
    ensure!(workers > 0, "at least one training worker is required");

    let dealer_cards = DEALER_CARDS.count();
    if workers > dealer_cards {
        log::info!("{} workers available, using {}", workers, dealer_cards);
    }
    Ok(workers.min(dealer_cards))
}

// Contiguous ranges covering all dealer cards. The first `cards % partitions` ranges
// take one extra card.
pub fn split_dealer_cards(partitions: usize) -> Vec<RangeInclusive<u32>> {
    let cards = DEALER_CARDS.count() as u32;
    let partitions = partitions.clamp(1, cards as usize) as u32;
    let base = cards / partitions;
    let remainder = cards % partitions;

    let mut lower = *DEALER_CARDS.start();
    (0..partitions)
        .map(|i| {
            let size = base + u32::from(i < remainder);
            let range = lower..=lower + size - 1;
            lower += size;
            range
        })
        .collect()
}

// Trains one partition per thread. Threads share nothing: each one borrows its own
// partition and owns its own generator.
pub fn train(settings: &Settings) -> Result<PolicyTable> {
    let workers = worker_count(settings)?;
    let seed = settings.seed.unwrap_or_else(rand::random);
    let iterations = settings.iterations;

    let mut partitions: Vec<Partition> = split_dealer_cards(workers)
        .into_iter()
        .map(Partition::new)
        .collect();
    log::info!(
        "training {} partitions, {} episodes each, seed {}",
        partitions.len(),
        iterations,
        seed
    );

    let started = Instant::now();
    thread::scope(|scope| -> Result<()> {
        let handles = partitions
            .iter_mut()
            .enumerate()
            .map(|(index, partition)| {
                let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(index as u64));
                thread::Builder::new()
                    .name(format!("partition-{}", index))
                    .spawn_scoped(scope, move || {
                        log::debug!("dealer cards {:?}: started", partition.dealer_cards());
                        partition.train(&mut rng, iterations);
                    })
                    .with_context(|| format!("failed to spawn training thread {}", index))
            })
            .collect::<Result<Vec<_>>>()?;

        let panicked = handles
            .into_iter()
            .map(|handle| handle.join())
            .filter(|joined| joined.is_err())
            .count();
        ensure!(panicked == 0, "{} training threads panicked", panicked);
        Ok(())
    })?;

    for partition in &partitions {
        let stats = partition.stats();
        log::info!(
            "dealer cards {:?}: {} episodes in {:.1?}, {} wins, {} draws, {} losses",
            partition.dealer_cards(),
            stats.episodes,
            stats.elapsed,
            stats.wins,
            stats.draws,
            stats.losses
        );
    }
    log::info!("training finished in {:.1?}", started.elapsed());

    Ok(PolicyTable::new(partitions))
}
