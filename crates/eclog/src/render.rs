use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use eclog_core::explore::ChartTable;
use eclog_core::quality::MissingValueReport;

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn missing_values_table(report: &MissingValueReport) -> Table {
    let mut table = base_table();
    table.set_header(vec!["Column", "Missing"]);
    for entry in &report.columns {
        table.add_row(vec![
            Cell::new(&entry.column),
            Cell::new(entry.missing).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Renders one chart as a table of bars; log-scaled charts carry an extra value column.
pub fn chart_table(chart: &ChartTable) -> Table {
    let mut table = base_table();
    if chart.log_scale {
        table.set_header(vec![chart.x_label, "Requests", "ln(1 + Requests)"]);
    } else {
        table.set_header(vec![chart.x_label, "Requests"]);
    }

    for bar in &chart.bars {
        let mut row = vec![
            Cell::new(&bar.label),
            Cell::new(bar.count).set_alignment(CellAlignment::Right),
        ];
        if chart.log_scale {
            row.push(Cell::new(format!("{:.3}", bar.value)).set_alignment(CellAlignment::Right));
        }
        table.add_row(row);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use eclog_core::explore::ChartBar;
    use eclog_core::quality::MissingValueCount;

    #[test]
    fn missing_values_render_one_row_per_column() {
        let report = MissingValueReport {
            row_count: 3,
            columns: vec![
                MissingValueCount {
                    column: "TimeStamp".to_string(),
                    missing: 2,
                },
                MissingValueCount {
                    column: "Uri".to_string(),
                    missing: 0,
                },
            ],
        };

        let table = missing_values_table(&report);
        assert_eq!(table.row_iter().count(), 2);
        let rendered = table.to_string();
        assert!(rendered.contains("TimeStamp"));
        assert!(rendered.contains("Missing"));
    }

    #[test]
    fn log_scaled_charts_show_both_values() {
        let chart = ChartTable {
            title: "HTTP Method Distribution".to_string(),
            x_label: "HTTP Method",
            log_scale: true,
            bars: vec![ChartBar {
                label: "GET".to_string(),
                count: 4,
                value: 5f64.ln(),
            }],
        };

        let rendered = chart_table(&chart).to_string();
        assert!(rendered.contains("ln(1 + Requests)"));
        assert!(rendered.contains("1.609"));
    }
}
