//! Size-bounded splitting of generated method bodies.
//!
//! Generated units have a practical size limit per method. Long bodies are
//! split into numbered sub-loaders (`load0`, `load1`, ...) called in index
//! order from one aggregate method.

use crate::artifact::{Expr, MethodSpec, Statement};

/// Default budget, in characters, for one generated method body.
pub const DEFAULT_MAX_UNIT_SIZE: usize = 30_000;

/// Split `items` into consecutive segments whose summed cost stays within
/// `max_size`. An item costlier than `max_size` gets a segment of its own.
/// Empty input yields no segments.
pub fn split_by_size<T, F>(items: impl IntoIterator<Item = T>, max_size: usize, cost: F) -> Vec<Vec<T>>
where
    F: Fn(&T) -> usize,
{
    let mut segments: Vec<Vec<T>> = Vec::new();
    let mut current_size = 0usize;
    for item in items {
        let item_cost = cost(&item);
        match segments.last_mut() {
            Some(segment) if current_size + item_cost <= max_size => {
                segment.push(item);
                current_size += item_cost;
            }
            _ => {
                segments.push(vec![item]);
                current_size = item_cost;
            }
        }
    }
    segments
}

/// Numbered sub-loader methods and the calls that invoke them in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SubLoaders {
    pub calls: Vec<Statement>,
    pub methods: Vec<MethodSpec>,
}

impl SubLoaders {
    /// One method `<prefix><index>` per segment; every sub-loader takes
    /// `params` and the calls pass them through by name.
    pub fn build(prefix: &str, params: &[(&str, &str)], segments: Vec<Vec<Statement>>) -> Self {
        let mut calls = Vec::with_capacity(segments.len());
        let mut methods = Vec::with_capacity(segments.len());
        for (index, body) in segments.into_iter().enumerate() {
            let name = format!("{}{}", prefix, index);
            let mut method = MethodSpec::new_static(name.clone());
            for (param, type_name) in params {
                method = method.param(*param, *type_name);
            }
            methods.push(method.body(body));
            calls.push(Statement::Expr(Expr::call(
                name,
                params.iter().map(|(param, _)| Expr::ident(*param)).collect(),
            )));
        }
        Self { calls, methods }
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
