use schemars::JsonSchema;
use std::fmt::Debug;

use serde::Serialize;
pub use serde_with;
use utility::id::{HasId, Id};

pub mod bus;
pub mod driver;
pub mod feedback;
pub mod lecturer;
pub mod location;
pub mod overview;
pub mod route;
pub mod schedule;
pub mod top_n;
pub mod user;
pub mod validation;
pub mod voice_note;

pub trait ExampleData {
    fn example_data() -> Self;
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub id: Id<V>,
    #[serde(flatten)]
    pub content: V,
}

impl<V> WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub fn new(id: Id<V>, content: V) -> Self {
        Self { id, content }
    }

    pub fn map<F>(self, f: F) -> Self
    where
        F: FnOnce(V) -> V,
    {
        Self::new(self.id, f(self.content))
    }
}

impl<V> ExampleData for WithId<V>
where
    V: HasId<IdType = i64> + ExampleData,
{
    fn example_data() -> Self {
        Self::new(Id::new(1), V::example_data())
    }
}

/// Case insensitive substring search over a set of optional fields, as used by
/// the `search` query parameter of list endpoints. An empty needle matches
/// everything.
pub fn search_matches(needle: &str, fields: &[Option<&str>]) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::search_matches;

    #[test]
    fn search_is_case_insensitive() {
        assert!(search_matches("kl-a", &[Some("KL-AB 123"), None]));
        assert!(!search_matches("xyz", &[Some("KL-AB 123"), None]));
    }

    #[test]
    fn blank_search_matches_everything() {
        assert!(search_matches("  ", &[None]));
    }
}
