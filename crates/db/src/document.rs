use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// A stored document as returned by a [`crate::DocumentStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub collection: String,
    pub id: String,
    /// Store-wide sequence number of the last write touching this document.
    pub version: u64,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Look up a field by dotted path (`address.city`).
    pub fn field(&self, path: &str) -> Option<&Value> {
        lookup(&self.data, path)
    }

    /// Decode the document body into a typed entity.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<Entity<T>> {
        let data = serde_json::from_value(self.data.clone()).map_err(|source| {
            StoreError::Decode {
                collection: self.collection.clone(),
                id: self.id.clone(),
                source,
            }
        })?;

        Ok(Entity {
            id: self.id.clone(),
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

/// Serialize a record, insisting on a JSON object body.
pub(crate) fn to_object<T: Serialize>(record: &T) -> StoreResult<Value> {
    let value = serde_json::to_value(record)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(StoreError::NotAnObject)
    }
}

/// A typed record together with its identity and timestamps.
///
/// Serializes flat: `{"id": ..., <record fields>, "created_at": ..., "updated_at": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<T> Deref for Entity<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for Entity<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Shelf {
        label: String,
        capacity: u32,
    }

    fn sample() -> Document {
        let now = Utc::now();
        Document {
            collection: "shelves".into(),
            id: "s1".into(),
            version: 3,
            data: json!({"label": "Poesía", "capacity": 40, "location": {"floor": 2}}),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_dotted_field_lookup() {
        let doc = sample();
        assert_eq!(doc.field("location.floor"), Some(&json!(2)));
        assert_eq!(doc.field("location.room"), None);
        assert_eq!(doc.field("label"), Some(&json!("Poesía")));
    }

    #[test]
    fn test_decode_and_flatten() {
        let entity: Entity<Shelf> = sample().decode().unwrap();
        assert_eq!(entity.id, "s1");
        assert_eq!(entity.capacity, 40);

        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value["id"], "s1");
        assert_eq!(value["label"], "Poesía");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_decode_reports_collection() {
        let mut doc = sample();
        doc.data = json!({"label": 7});
        let err = doc.decode::<Shelf>().unwrap_err();
        assert!(matches!(err, StoreError::Decode { ref collection, .. } if collection == "shelves"));
    }
}
