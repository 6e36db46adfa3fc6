use std::{borrow::Cow, cmp, fmt, hash, marker::PhantomData};

use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, Metadata, Schema, SchemaObject},
    JsonSchema,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An entity stored under a key of type `IdType`.
pub trait HasId {
    type IdType;
}

/// Identifier of a `T`. The phantom type keeps ids of different entities
/// apart, e.g. a route id can not be passed where a bus id is expected.
///
/// Ids are `Send` and `Sync` whenever the raw key is, independent of `T`.
pub struct Id<T: HasId> {
    raw: T::IdType,
    entity: PhantomData<fn() -> T>,
}

impl<T: HasId> Id<T> {
    pub fn new(raw: T::IdType) -> Self {
        Self {
            raw,
            entity: PhantomData,
        }
    }
}

impl<T: HasId> Id<T>
where
    T::IdType: Clone,
{
    pub fn raw(&self) -> T::IdType {
        self.raw.clone()
    }

    /// Raw keys of `ids` in the same order, e.g. to bind them as one array
    /// parameter.
    pub fn raw_all(ids: &[Self]) -> Vec<T::IdType> {
        ids.iter().map(Self::raw).collect()
    }
}

impl<T: HasId> fmt::Debug for Id<T>
where
    T::IdType: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({:?})", self.raw)
    }
}

impl<T: HasId> fmt::Display for Id<T>
where
    T::IdType: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.fmt(f)
    }
}

impl<T: HasId> Clone for Id<T>
where
    T::IdType: Clone,
{
    fn clone(&self) -> Self {
        Self::new(self.raw.clone())
    }
}

impl<T: HasId> Copy for Id<T> where T::IdType: Copy {}

impl<T: HasId> hash::Hash for Id<T>
where
    T::IdType: hash::Hash,
{
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state)
    }
}

impl<T: HasId> PartialEq for Id<T>
where
    T::IdType: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: HasId> Eq for Id<T> where T::IdType: Eq {}

impl<T: HasId> PartialOrd for Id<T>
where
    T::IdType: Ord,
{
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: HasId> Ord for Id<T>
where
    T::IdType: Ord,
{
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

// On the wire an id is just its raw key.

impl<'de, T: HasId> Deserialize<'de> for Id<T>
where
    T::IdType: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::IdType::deserialize(deserializer).map(Self::new)
    }
}

impl<T: HasId> Serialize for Id<T>
where
    T::IdType: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<T: HasId + JsonSchema> JsonSchema for Id<T> {
    fn schema_name() -> String {
        format!("{}Id", T::schema_name())
    }

    fn schema_id() -> Cow<'static, str> {
        Cow::Owned(format!("{}::Id<{}>", module_path!(), T::schema_id()))
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::Integer.into()),
            format: Some("int64".to_owned()),
            metadata: Some(Box::new(Metadata {
                description: Some(format!("Id of a {}.", T::schema_name())),
                ..Default::default()
            })),
            ..Default::default()
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bus;

    impl HasId for Bus {
        type IdType = i64;
    }

    #[test]
    fn ids_serialize_transparently() {
        let id: Id<Bus> = Id::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let parsed: Id<Bus> = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, Id::new(7));
    }

    #[test]
    fn raw_all_keeps_order() {
        let ids: Vec<Id<Bus>> = vec![Id::new(3), Id::new(1)];
        assert_eq!(Id::raw_all(&ids), vec![3, 1]);
    }

    #[test]
    fn ids_order_by_raw_key() {
        let mut ids: Vec<Id<Bus>> = vec![Id::new(9), Id::new(2), Id::new(5)];
        ids.sort();
        assert_eq!(Id::raw_all(&ids), vec![2, 5, 9]);
        assert_eq!(format!("{} {:?}", ids[0], ids[0]), "2 Id(2)");
    }
}
