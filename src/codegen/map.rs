//! Literal map generation.
//!
//! Converts structured values into expression trees. The top-level map is
//! inlined; nested lists and maps are moved into helper methods named
//! `list<N>` and `map<N>` so no single expression grows unbounded.

use crate::artifact::{Expr, MethodSpec, Statement};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct MapGenerator {
    helpers: Vec<MethodSpec>,
    next_list: usize,
    next_map: usize,
}

impl MapGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inline map expression for `entries`, keys in sorted order.
    pub fn generate_map<'a, I>(&mut self, entries: I) -> Expr
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let sorted: BTreeMap<&String, &Value> = entries.into_iter().collect();
        Expr::Map(
            sorted
                .into_iter()
                .map(|(k, v)| (Expr::str(k.clone()), self.value_expr(v)))
                .collect(),
        )
    }

    pub fn value_expr(&mut self, value: &Value) -> Expr {
        match value {
            Value::Null => Expr::Null,
            Value::Bool(b) => Expr::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Expr::Int(i),
                None => Expr::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Expr::str(s.clone()),
            Value::Array(items) => {
                let name = format!("list{}", self.next_list);
                self.next_list += 1;
                let list = Expr::List(items.iter().map(|item| self.value_expr(item)).collect());
                self.helpers.push(
                    MethodSpec::new_static(name.clone())
                        .returns("List")
                        .statement(Statement::Return(list)),
                );
                Expr::call(name, vec![])
            }
            Value::Object(map) => {
                let name = format!("map{}", self.next_map);
                self.next_map += 1;
                let inner = self.generate_map(map.iter());
                self.helpers.push(
                    MethodSpec::new_static(name.clone())
                        .returns("Map")
                        .statement(Statement::Return(inner)),
                );
                Expr::call(name, vec![])
            }
        }
    }

    /// Helper methods produced so far, in creation order.
    pub fn into_helpers(self) -> Vec<MethodSpec> {
        self.helpers
    }
}
