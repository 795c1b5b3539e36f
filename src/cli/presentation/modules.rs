//! Module listing formatters.

use super::format_section_heading;
use crate::error::PipelineError;
use crate::module::ModuleDescriptor;
use crate::types::Profile;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;

#[derive(Serialize)]
struct ModuleListOutput<'a> {
    runtime: Profile,
    modules: &'a [&'a ModuleDescriptor],
    total: usize,
}

fn profiles_label(descriptor: &ModuleDescriptor) -> String {
    descriptor
        .profiles
        .profiles()
        .iter()
        .map(|p| p.slug())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Execution-ordered module table.
pub fn format_modules_text(profile: Profile, descriptors: &[&ModuleDescriptor]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Modules ({})", profile))
    ));
    if descriptors.is_empty() {
        out.push_str("No modules apply to this runtime.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Module", "Runtimes", "Default", "Depends on", "Description"]);
    for (index, descriptor) in descriptors.iter().enumerate() {
        let depends = if descriptor.dependencies.is_empty() {
            "-".to_string()
        } else {
            descriptor.dependencies.join(", ")
        };
        table.add_row(vec![
            (index + 1).to_string(),
            descriptor.id.clone(),
            profiles_label(descriptor),
            if descriptor.enabled_by_default { "on" } else { "off" }.to_string(),
            depends,
            descriptor.description.clone(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out.push_str(&format!("\nTotal: {} module(s)", descriptors.len()));
    out
}

pub fn format_modules_json(
    profile: Profile,
    descriptors: &[&ModuleDescriptor],
) -> Result<String, PipelineError> {
    let output = ModuleListOutput {
        runtime: profile,
        modules: descriptors,
        total: descriptors.len(),
    };
    serde_json::to_string_pretty(&output)
        .map_err(|e| PipelineError::GenerationFailed(format!("Failed to serialize module list: {}", e)))
}
