//! Plain-text rendering of experiment results.

use vis_analysis::ResultSet;

use crate::commands::{contract_name, RunReport};

/// Offset in quarter lengths, trimmed (`1`, `1.5`, `0.25`).
fn quarters(ticks: u64, ticks_per_quarter: u32) -> String {
    let value = ticks as f64 / f64::from(ticks_per_quarter.max(1));
    let text = format!("{value:.3}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn part_name(report: &RunReport, index: usize) -> &str {
    report
        .part_names
        .get(index)
        .map(String::as_str)
        .unwrap_or("?")
}

pub fn render(report: &RunReport) -> String {
    let config = &report.configuration;
    let names: Vec<&str> = config
        .part_combination
        .parts()
        .iter()
        .map(|&i| part_name(report, i))
        .collect();

    let mut out = format!(
        "{} - {} {} over {} every {} ql ({})\n",
        report.title,
        config.object_kind,
        config.display_mode,
        names.join(" / "),
        config.offset_interval,
        contract_name(report.contract),
    );

    if report.result.is_empty() {
        out.push_str("(no results)\n");
        return out;
    }

    match &report.result {
        ResultSet::Frequencies(entries) => {
            let width = entries.iter().map(|e| e.label.len()).max().unwrap_or(0);
            for entry in entries {
                out.push_str(&format!("{:<width$}  {:>5}\n", entry.label, entry.count));
            }
            let total: usize = entries.iter().map(|e| e.count).sum();
            out.push_str(&format!("{:<width$}  {:>5}\n", "total", total));
        }
        ResultSet::Annotations(entries) => {
            for entry in entries {
                out.push_str(&format!(
                    "{:<12} {:>8}  {}\n",
                    part_name(report, entry.part),
                    quarters(entry.offset, report.ticks_per_quarter),
                    entry.label
                ));
            }
        }
        ResultSet::Summary(entries) => {
            for (rank, entry) in entries.iter().enumerate() {
                out.push_str(&format!(
                    "{:>3}. {}  x{}  (first at {}-{})\n",
                    rank + 1,
                    entry.label,
                    entry.count,
                    quarters(entry.context.span.start, report.ticks_per_quarter),
                    quarters(entry.context.span.end, report.ticks_per_quarter),
                ));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn quarter_lengths_are_trimmed() {
        assert_eq!(quarters(0, 480), "0");
        assert_eq!(quarters(480, 480), "1");
        assert_eq!(quarters(720, 480), "1.5");
        assert_eq!(quarters(120, 480), "0.25");
    }
}
