//! Shared generation helpers.

pub mod chunked;
pub mod map;

pub use chunked::{split_by_size, SubLoaders, DEFAULT_MAX_UNIT_SIZE};
pub use map::MapGenerator;

/// Type-name fragment derived from a resource or capability name:
/// `application-test` becomes `ApplicationTest`.
pub fn type_name_fragment(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
