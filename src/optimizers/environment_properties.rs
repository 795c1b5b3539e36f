//! Precomputed property names for environment variables.
//!
//! A variable `A_B_C` can stand for any property whose segments are joined by
//! `.` or `-`, so each variable maps to every such join of its lower-cased
//! segments. The resulting table is emitted as a loader split into
//! size-bounded sub-loaders.
//!
//! A variable with `n` segments expands to `2^(n-1)` names, so variables with
//! more than `precompute.environment.properties.max.segments` segments are
//! skipped with a diagnostic.

use crate::artifact::{runtime, Expr, Statement};
use crate::codegen::{split_by_size, SubLoaders, DEFAULT_MAX_UNIT_SIZE};
use crate::context::{GenerationContext, LoaderBody};
use crate::error::PipelineError;
use crate::module::{Module, ModuleDescriptor, OptionSpec};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const ID: &str = "precompute.environment.properties";
pub const MAX_SEGMENTS_KEY: &str = "precompute.environment.properties.max.segments";
pub const DEFAULT_MAX_SEGMENTS: usize = 16;
/// Largest accepted cap; 24 segments already expand to over 8M names.
const HARD_MAX_SEGMENTS: usize = 24;
const LOADER_NAME: &str = "EnvironmentPropertiesOptimizationLoader";
/// Characters of one `env.put(...)` line excluding key and values.
const FIXED_LINE_SIZE: usize = 37;

pub struct EnvironmentPropertiesModule {
    descriptor: ModuleDescriptor,
}

impl EnvironmentPropertiesModule {
    pub fn new() -> Self {
        Self {
            descriptor: ModuleDescriptor::new(ID)
                .description(
                    "Precomputes configuration property keys from the current environment variables",
                )
                .option(OptionSpec::new(
                    MAX_SEGMENTS_KEY,
                    "Environment variables with more '_' separated segments than this are not precomputed",
                    DEFAULT_MAX_SEGMENTS.to_string(),
                )),
        }
    }
}

impl Default for EnvironmentPropertiesModule {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-empty `_` separated segments of a variable.
pub fn segment_count(variable: &str) -> usize {
    variable.split('_').filter(|s| !s.is_empty()).count()
}

/// Candidate property names for an environment variable, all-`.` join first.
/// `None` when the variable has more than `max_segments` segments.
pub fn property_names_for(variable: &str, max_segments: usize) -> Option<Vec<String>> {
    let lowered = variable.to_lowercase();
    let segments: Vec<&str> = lowered.split('_').filter(|s| !s.is_empty()).collect();
    if segments.len() > max_segments.min(HARD_MAX_SEGMENTS) {
        return None;
    }
    let Some((first, rest)) = segments.split_first() else {
        return Some(Vec::new());
    };
    let separators = rest.len();
    let combinations = 1u64.checked_shl(separators as u32)?;
    Some(
        (0..combinations)
            .map(|mask| {
                let mut name = first.to_string();
                for (i, segment) in rest.iter().enumerate() {
                    let dash = mask & (1u64 << (separators - 1 - i)) != 0;
                    name.push(if dash { '-' } else { '.' });
                    name.push_str(segment);
                }
                name
            })
            .collect(),
    )
}

/// Variable name to its candidate property names, plus the variables skipped
/// for exceeding `max_segments`.
pub fn environment_properties<'a>(
    variables: impl IntoIterator<Item = &'a String>,
    max_segments: usize,
) -> (BTreeMap<String, Vec<String>>, Vec<String>) {
    let mut properties = BTreeMap::new();
    let mut skipped = Vec::new();
    for variable in variables {
        match property_names_for(variable, max_segments) {
            Some(names) if names.is_empty() => {}
            Some(names) => {
                properties.insert(variable.clone(), names);
            }
            None => skipped.push(variable.clone()),
        }
    }
    (properties, skipped)
}

fn max_segments(ctx: &GenerationContext) -> Result<usize, PipelineError> {
    let configured = ctx
        .config()
        .integer(MAX_SEGMENTS_KEY, DEFAULT_MAX_SEGMENTS as i64)?;
    usize::try_from(configured)
        .ok()
        .filter(|max| (1..=HARD_MAX_SEGMENTS).contains(max))
        .ok_or_else(|| {
            PipelineError::ConfigError(format!(
                "{} must be between 1 and {}, got {}",
                MAX_SEGMENTS_KEY, HARD_MAX_SEGMENTS, configured
            ))
        })
}

fn quoted_values(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn loader_body(properties: &BTreeMap<String, Vec<String>>) -> LoaderBody {
    let segments: Vec<Vec<Statement>> = split_by_size(
        properties.iter(),
        DEFAULT_MAX_UNIT_SIZE,
        |(key, values)| FIXED_LINE_SIZE + key.len() + quoted_values(values).len() + 2,
    )
    .into_iter()
    .map(|segment| {
        segment
            .into_iter()
            .map(|(key, values)| {
                Statement::Expr(Expr::call_on(
                    Expr::ident("env"),
                    "put",
                    vec![
                        Expr::str(key.clone()),
                        Expr::List(values.iter().map(|v| Expr::str(v.clone())).collect()),
                    ],
                ))
            })
            .collect()
    })
    .collect();
    let loaders = SubLoaders::build("load", &[("env", "Map")], segments);

    let mut statements = vec![Statement::Let {
        name: "env".to_string(),
        value: Expr::new_instance("HashMap", vec![]),
    }];
    statements.extend(loaders.calls);
    statements.push(Statement::Return(Expr::call_static(
        runtime::ENVIRONMENT_PROPERTIES,
        "of",
        vec![Expr::ident("env")],
    )));
    LoaderBody {
        statements,
        helpers: loaders.methods,
    }
}

impl Module for EnvironmentPropertiesModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        let max_segments = max_segments(ctx)?;
        let (properties, skipped) = environment_properties(
            ctx.analyzer().snapshot().environment_variables.keys(),
            max_segments,
        );
        for variable in &skipped {
            warn!(variable = %variable, max_segments, "Skipping environment variable");
            ctx.add_diagnostic(
                ID,
                format!(
                    "Skipping environment variable {}: {} segments exceed the limit of {}",
                    variable,
                    segment_count(variable),
                    max_segments
                ),
            );
        }
        debug!(variables = properties.len(), "Precomputing environment properties");
        ctx.register_static_optimization(LOADER_NAME, runtime::ENVIRONMENT_PROPERTIES, || {
            loader_body(&properties)
        })?;
        Ok(())
    }
}
