//! Shared CLI output helpers and the profit report renderer.

use std::fmt::Display;
use std::io::{self, Write};

use rust_decimal::Decimal;

use crate::domain::profit::{Money, RecipeReport};

const RULE_WIDTH: usize = 56;
const MONEY_WIDTH: usize = 16;

/// Print a section header and separator.
pub fn section(title: &str) {
    println!();
    println!("{title}");
    println!("{}", "─".repeat(RULE_WIDTH));
}

/// Print a simple key/value line.
pub fn key_value(label: &str, value: impl Display) {
    println!("{label:<14} {value}");
}

/// Print a successful status line.
pub fn ok(message: &str) {
    println!("✓ {message}");
}

/// Print a warning status line.
pub fn warn(message: &str) {
    println!("⚠ {message}");
}

/// Print an error status line.
pub fn error(message: &str) {
    eprintln!("✗ {message}");
}

/// Print a single-line note.
pub fn note(message: &str) {
    println!("{message}");
}

/// Start a progress line in the format `Label... `.
pub fn progress(label: &str) {
    print!("{label}... ");
    let _ = io::stdout().flush();
}

/// Finish a progress line.
pub fn progress_done(success: bool) {
    println!("{}", if success { "ok" } else { "failed" });
}

/// An optional amount, `-` when unknown.
pub fn money(amount: Option<Decimal>) -> String {
    amount.map_or_else(|| "-".to_string(), |amount| Money(amount).to_string())
}

pub fn report_header() -> String {
    format!(
        "{:>w$} {:>w$} {:>w$}  Recipe",
        "Profit",
        "Sell",
        "Cost",
        w = MONEY_WIDTH
    )
}

pub fn report_row(report: &RecipeReport) -> String {
    format!(
        "{:>w$} {:>w$} {:>w$}  {}",
        money(report.profit),
        money(report.selling_price),
        money(report.production_cost),
        report.name,
        w = MONEY_WIDTH
    )
}

/// Indented breakdown lines of one report.
pub fn report_details(report: &RecipeReport) -> Vec<String> {
    let mut lines = Vec::new();
    for reagent in &report.reagents {
        lines.push(format!(
            "    {} x {} @ {} = {} ({})",
            reagent.quantity.normalize(),
            reagent.item_name,
            money(reagent.unit_price),
            money(reagent.total()),
            reagent.tag
        ));
    }
    if let Some(disenchant) = &report.disenchant {
        lines.push(format!(
            "    disenchants {} @ {}",
            disenchant.item_name,
            Money(disenchant.unit_cost)
        ));
    }
    if let Some(failure) = &report.failure {
        lines.push(format!("    ⚠ {failure}"));
    }
    lines
}

/// Print the profit table; with `details` every reagent line follows its
/// recipe.
pub fn profit_table(reports: &[RecipeReport], details: bool) {
    section(&format!("Profit ({} recipes)", reports.len()));
    note(&report_header());
    for report in reports {
        note(&report_row(report));
        if details {
            for line in report_details(report) {
                note(&line);
            }
        }
    }
    let unpriced = reports.iter().filter(|report| report.profit.is_none()).count();
    if unpriced > 0 {
        println!();
        warn(&format!("{unpriced} recipes could not be priced"));
    }
}

/// Print reports as a JSON array.
pub fn profit_json(reports: &[RecipeReport]) {
    match serde_json::to_string_pretty(reports) {
        Ok(json) => println!("{json}"),
        Err(err) => error(&format!("failed to encode report: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::RecipeKind;
    use crate::domain::profit::{AcquisitionTag, DisenchantReport, ReagentLine};
    use crate::domain::resolution::ResolutionFailure;
    use rust_decimal_macros::dec;

    fn report() -> RecipeReport {
        RecipeReport {
            recipe_id: 42,
            name: "Spectral Flask of Power".to_string(),
            kind: RecipeKind::Normal,
            profession_id: 171,
            tier_id: 2750,
            selling_price: Some(dec!(305000)),
            production_cost: Some(dec!(200050)),
            profit: Some(dec!(104950)),
            reagents: vec![
                ReagentLine {
                    item_id: 171315,
                    item_name: "Nightshade".to_string(),
                    quantity: dec!(3.00),
                    unit_price: Some(dec!(50000)),
                    tag: AcquisitionTag::Market,
                },
                ReagentLine {
                    item_id: 180732,
                    item_name: "Rune Etched Vial".to_string(),
                    quantity: dec!(1),
                    unit_price: None,
                    tag: AcquisitionTag::Unavailable,
                },
            ],
            disenchant: None,
            failure: None,
        }
    }

    #[test]
    fn row_aligns_amounts() {
        let row = report_row(&report());

        assert!(row.ends_with("  Spectral Flask of Power"));
        assert!(row.contains("10g 49s 50c"));
        assert!(row.contains("30g 50s 00c"));
        assert_eq!(report_header().len(), 3 * MONEY_WIDTH + 2 + 2 + "Recipe".len());
    }

    #[test]
    fn unknown_amounts_render_as_dash() {
        let mut report = report();
        report.profit = None;
        report.production_cost = None;

        let row = report_row(&report);

        assert_eq!(row.matches(" -").count(), 2);
    }

    #[test]
    fn details_list_reagents_and_failure() {
        let mut report = report();
        report.failure = Some(ResolutionFailure::UnobtainableReagent {
            recipe_id: 42,
            item_id: 180732,
        });

        let lines = report_details(&report);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "    3 x Nightshade @ 5g 00s 00c = 15g 00s 00c (market)");
        assert_eq!(lines[1], "    1 x Rune Etched Vial @ - = - (unavailable)");
        assert!(lines[2].starts_with("    ⚠ "));
    }

    #[test]
    fn details_name_disenchanted_item() {
        let mut report = report();
        report.reagents.clear();
        report.disenchant = Some(DisenchantReport {
            item_id: 178926,
            item_name: "Shadowghast Ring".to_string(),
            unit_cost: dec!(1250),
        });

        assert_eq!(
            report_details(&report),
            vec!["    disenchants Shadowghast Ring @ 12s 50c".to_string()]
        );
    }
}
