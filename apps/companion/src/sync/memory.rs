use std::cmp;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::remote::{
    merge_fields, split_document_path, AuthProvider, Direction, Document, DocumentStore, Fields,
    Identity, RemoteError,
};
use serde_json::Value;

/// Missing values sort last, numbers numerically, strings lexically.
fn compare_field_values(a: Option<&Value>, b: Option<&Value>) -> cmp::Ordering {
    match (a, b) {
        (None, None) => cmp::Ordering::Equal,
        (None, Some(_)) => cmp::Ordering::Greater,
        (Some(_), None) => cmp::Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(cmp::Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// In-memory document store with an outage switch.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Fields>>>,
    next_id: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn documents(&self, collection: &str) -> Vec<Fields> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), RemoteError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable("offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_document(&self, path: &str) -> Result<Option<Fields>, RemoteError> {
        self.check()?;
        let (collection, id) = split_document_path(path)?;
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn set_document(
        &self,
        path: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), RemoteError> {
        self.check()?;
        let (collection, id) = split_document_path(path)?;
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) if merge => merge_fields(existing, fields),
            _ => {
                docs.insert(id.to_string(), fields);
            }
        }
        Ok(())
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, RemoteError> {
        self.check()?;
        let id = format!("doc{:04}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut collections = self.collections.lock().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn query_collection(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<Document>, RemoteError> {
        self.check()?;
        let collections = self.collections.lock().unwrap();
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        docs.sort_by(|a, b| {
            let ordering = compare_field_values(a.fields.get(order_by), b.fields.get(order_by));
            match direction {
                Direction::Ascending => ordering,
                // Missing values stay last in both directions.
                Direction::Descending => match (a.fields.get(order_by), b.fields.get(order_by)) {
                    (Some(_), Some(_)) => ordering.reverse(),
                    _ => ordering,
                },
            }
        });
        docs.truncate(limit);
        Ok(docs)
    }
}

/// In-memory auth provider that remembers every uid it has issued.
#[derive(Default)]
pub struct MemoryAuth {
    current: Mutex<Option<Identity>>,
    known: Mutex<HashSet<String>>,
    sign_ins: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn sign_in_count(&self) -> usize {
        self.sign_ins.load(Ordering::SeqCst)
    }

    /// Simulates a process restart: the session is gone, issued uids are not.
    pub fn sign_out(&self) {
        *self.current.lock().unwrap() = None;
    }

    pub fn forget_all(&self) {
        self.known.lock().unwrap().clear();
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_in_anonymously(&self) -> Result<Identity, RemoteError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("offline".to_string()));
        }
        let n = self.sign_ins.fetch_add(1, Ordering::SeqCst) + 1;
        let identity = Identity {
            uid: format!("anon-{n}"),
            anonymous: true,
        };
        self.known.lock().unwrap().insert(identity.uid.clone());
        *self.current.lock().unwrap() = Some(identity.clone());
        Ok(identity)
    }

    async fn resume(&self, identity: &Identity) -> Result<bool, RemoteError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("offline".to_string()));
        }
        let known = self.known.lock().unwrap().contains(&identity.uid);
        if known {
            *self.current.lock().unwrap() = Some(identity.clone());
        }
        Ok(known)
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_values_sort_last() {
        let three = json!(3);
        let ten = json!(10);
        assert_eq!(
            compare_field_values(Some(&three), Some(&ten)),
            cmp::Ordering::Less
        );
        assert_eq!(
            compare_field_values(None, Some(&three)),
            cmp::Ordering::Greater
        );
    }
}
