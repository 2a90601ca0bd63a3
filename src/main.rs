mod blackjack;
mod report;
mod solver;

use std::io::{self, BufRead};

use anyhow::{Context, Result};

use blackjack::PlayerState;
use solver::Settings;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::default();
    let table = solver::train(&settings)?;

    for usable_ace in [true, false] {
        print!("{}", report::policy_grid(&table, usable_ace));
    }
    for usable_ace in [true, false] {
        println!("{}", report::policy_chart(&table, usable_ace)?);
    }
    report::training_summary(&table).printstd();

    // Compare against the naive policy on normally dealt hands.
    log::info!("evaluating policies over {} hands", settings.evaluation_hands);
    let mut rng = solver::evaluation_rng(&settings);
    let learned = solver::evaluate(&mut rng, settings.evaluation_hands, &|state: &PlayerState| {
        table.decide(state)
    });
    let naive = solver::evaluate(&mut rng, settings.evaluation_hands, &blackjack::stick_at_20);
    report::evaluation_summary(&[("learned", learned), ("stick at 20", naive)]).printstd();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(())
}
