//! Terminal presentation of the run's results.

use comfy_table::Cell;

use crate::aggregate::{AggregateRow, SecurityRow};
use crate::lookthrough::LookupMiss;
use crate::ui;

/// Securities shown in the terminal table; the full list goes to the report.
const TOP_SECURITIES: usize = 15;

pub fn securities_table(rows: &[SecurityRow]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Security"),
        ui::header_cell("Ticker"),
        ui::header_cell("Sector"),
        ui::header_cell("Country"),
        ui::header_cell("Weight (%)"),
    ]);
    for row in rows.iter().take(TOP_SECURITIES) {
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(&row.ticker),
            Cell::new(&row.sector),
            Cell::new(&row.country),
            ui::weight_cell(row.weight),
        ]);
    }

    let title = ui::style_text(
        &format!("Top {} look-through exposures", rows.len().min(TOP_SECURITIES)),
        ui::StyleType::Title,
    );
    format!("{title}\n\n{table}")
}

pub fn aggregate_table(title: &str, key_header: &str, rows: &[AggregateRow]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell(key_header), ui::header_cell("Weight (%)")]);
    for row in rows {
        table.add_row(vec![Cell::new(&row.key), ui::weight_cell(row.weight)]);
    }
    format!("{}\n\n{table}", ui::style_text(title, ui::StyleType::Title))
}

/// Footer: look-through mass sanity check plus every lookup gap of the run.
pub fn run_footer(weighting_summary: &str, misses: &[LookupMiss]) -> String {
    let mut out = format!(
        "{} {}",
        ui::style_text("Summary:", ui::StyleType::TotalLabel),
        weighting_summary
    );
    for miss in misses {
        out.push('\n');
        out.push_str(&ui::style_text(&format!("  ! {miss}"), ui::StyleType::Warning));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footer_lists_every_miss() {
        let misses = vec![
            LookupMiss::FundConstituents { fund: "FundB".to_string() },
            LookupMiss::Price { ticker: "GHOST".to_string() },
        ];
        let footer = run_footer("funds account for 40.00% of the portfolio.", &misses);
        assert!(footer.contains("FundB"));
        assert!(footer.contains("GHOST"));
        assert!(footer.contains("40.00%"));
    }

    #[test]
    fn securities_table_is_capped() {
        let rows: Vec<SecurityRow> = (0..40)
            .map(|i| SecurityRow {
                name: format!("S{i}"),
                ticker: format!("T{i}"),
                sector: "IT".to_string(),
                country: "USA".to_string(),
                weight: 1.0,
            })
            .collect();
        let rendered = securities_table(&rows);
        assert!(rendered.contains("S0"));
        assert!(!rendered.contains("S20"));
    }
}
