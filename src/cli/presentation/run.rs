//! Run summary formatter.

use super::format_section_heading;
use crate::pipeline::RunSummary;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use std::path::Path;

pub fn format_run_summary_text(summary: &RunSummary, output: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Optimization run")));
    out.push_str(&format!("  Runtime: {}\n", summary.profile));
    out.push_str(&format!("  Package: {}\n", summary.namespace));
    out.push_str(&format!("  Output: {}\n", output.display()));
    out.push_str(&format!("  Generated at: {}\n\n", summary.generated_at));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Executed modules", "Generated units"]);
    let rows = summary.executed_modules.len().max(summary.units.len());
    for i in 0..rows {
        table.add_row(vec![
            summary.executed_modules.get(i).cloned().unwrap_or_default(),
            summary.units.get(i).cloned().unwrap_or_default(),
        ]);
    }
    out.push_str(&format!("{}\n", table));

    if !summary.excluded_resources.is_empty() {
        out.push_str(&format!(
            "\n  Excluded resources: {}\n",
            summary
                .excluded_resources
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    if !summary.diagnostics.is_empty() {
        out.push_str("\n  Diagnostics:\n");
        for (category, count) in &summary.diagnostics {
            out.push_str(&format!("    {}: {} message(s)\n", category, count));
        }
    }
    out.trim_end().to_string()
}
