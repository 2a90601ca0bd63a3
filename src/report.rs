use anyhow::{anyhow, Result};
use plotlib::{
    page::Page,
    repr::Plot,
    style::{PointMarker, PointStyle},
    view::ContinuousView,
};
use prettytable::{Cell, Row, Table};

use crate::blackjack::{Action, DEALER_CARDS, PLAYER_SUMS};
use crate::solver::PolicyTable;

// Plain 0/1 grid: rows from 21 down, one column per dealer card, followed by the
// dealer card header and an empty line.
pub fn policy_grid(table: &PolicyTable, usable_ace: bool) -> String {
    let mut grid = String::new();
    for player_sum in PLAYER_SUMS.rev() {
        grid.push_str(&format!("{} ", player_sum));
        for dealer_card in DEALER_CARDS {
            let action = table
                .action(player_sum, usable_ace, dealer_card)
                .unwrap_or_default();
            grid.push_str(action.token());
            grid.push(' ');
        }
        grid.push('\n');
    }

    grid.push_str("   ");
    for dealer_card in DEALER_CARDS {
        grid.push_str(&format!("{} ", dealer_card));
    }
    grid.push_str("\n\n");
    grid
}

// Scatter chart of the decisions: crosses hit, circles stick.
pub fn policy_chart(table: &PolicyTable, usable_ace: bool) -> Result<String> {
    let mut hits = Vec::new();
    let mut sticks = Vec::new();
    for player_sum in PLAYER_SUMS {
        for dealer_card in DEALER_CARDS {
            let point = (dealer_card as f64, player_sum as f64);
            match table.action(player_sum, usable_ace, dealer_card) {
                Some(Action::Hit) => hits.push(point),
                _ => sticks.push(point),
            }
        }
    }

    let title = if usable_ace {
        "Player sum (usable ace)"
    } else {
        "Player sum (no usable ace)"
    };
    let mut view = ContinuousView::new()
        .x_range(0.0, 11.0)
        .y_range(10.0, 22.0)
        .x_label("Dealer card")
        .y_label(title);
    // Empty series are left out of the view.
    for (points, marker) in [(hits, PointMarker::Cross), (sticks, PointMarker::Circle)] {
        if !points.is_empty() {
            view = view.add(Plot::new(points).point_style(PointStyle::new().marker(marker)));
        }
    }

    Page::single(&view)
        .dimensions(60, 30)
        .to_text()
        .map_err(|e| anyhow!("failed to render policy chart: {}", e))
}

pub fn training_summary(table: &PolicyTable) -> Table {
    let mut summary = Table::new();
    summary.add_row(Row::new(
        ["Dealer cards", "Episodes", "Wins", "Draws", "Losses", "Elapsed"]
            .iter()
            .map(|title| Cell::new(title))
            .collect(),
    ));

    for partition in table.partitions() {
        let stats = partition.stats();
        let cards = partition.dealer_cards();
        summary.add_row(Row::new(vec![
            Cell::new(&format!("{}-{}", cards.start(), cards.end())),
            Cell::new(&format!("{}", stats.episodes)),
            Cell::new(&format!("{}", stats.wins)),
            Cell::new(&format!("{}", stats.draws)),
            Cell::new(&format!("{}", stats.losses)),
            Cell::new(&format!("{:.1?}", stats.elapsed)),
        ]));
    }
    summary
}

pub fn evaluation_summary(returns: &[(&str, f64)]) -> Table {
    let mut summary = Table::new();
    summary.add_row(Row::new(vec![Cell::new("Policy"), Cell::new("Average return")]));
    for (name, average) in returns {
        summary.add_row(Row::new(vec![
            Cell::new(name),
            Cell::new(&format!("{:+.4}", average)),
        ]));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::parallel::split_dealer_cards;
    use crate::solver::Partition;

    fn untrained_table() -> PolicyTable {
        PolicyTable::new(split_dealer_cards(3).into_iter().map(Partition::new).collect())
    }

    #[test]
    fn grid_layout() {
        let grid = policy_grid(&untrained_table(), true);
        let lines: Vec<&str> = grid.split('\n').collect();

        // 11 sums, the header, the empty line and the remainder after the last newline.
        assert_eq!(lines.len(), 14);
        assert_eq!(lines[0], "21 0 0 0 0 0 0 0 0 0 0 ");
        assert_eq!(lines[1], "20 0 0 0 0 0 0 0 0 0 0 ");
        assert_eq!(lines[2], "19 1 1 1 1 1 1 1 1 1 1 ");
        assert_eq!(lines[10], "11 1 1 1 1 1 1 1 1 1 1 ");
        assert_eq!(lines[11], "   1 2 3 4 5 6 7 8 9 10 ");
        assert_eq!(lines[12], "");
    }

    #[test]
    fn chart_renders() {
        let chart = policy_chart(&untrained_table(), false).unwrap();
        assert!(!chart.trim().is_empty());
    }

    #[test]
    fn summaries_have_a_row_per_entry() {
        let table = untrained_table();
        assert_eq!(training_summary(&table).len(), 4);
        assert_eq!(evaluation_summary(&[("learned", 0.1), ("stick at 20", -0.2)]).len(), 3);
    }
}
