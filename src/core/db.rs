use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{BLOGS_COLLECTION, USERS_COLLECTION};
use crate::core::helpers::{hash_password, new_id, now_iso};
use crate::models::models::{Blog, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
struct Document {
    seq: u64,
    body: Value,
}

#[derive(Debug, Default)]
struct Collections {
    next_seq: u64,
    by_name: HashMap<String, BTreeMap<String, Document>>,
}

impl Collections {
    fn collection(&self, name: &str) -> Option<&BTreeMap<String, Document>> {
        self.by_name.get(name)
    }

    fn collection_mut(&mut self, name: &str) -> &mut BTreeMap<String, Document> {
        self.by_name.entry(name.to_string()).or_default()
    }

    fn push(&mut self, collection: &str, id: &str, body: Value) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.collection_mut(collection)
            .insert(id.to_string(), Document { seq, body });
    }

    fn remove(&mut self, collection: &str, id: &str) {
        if let Some(docs) = self.by_name.get_mut(collection) {
            docs.remove(id);
        }
    }

    fn set_body(&mut self, collection: &str, id: &str, body: Value) {
        if let Some(doc) = self.collection_mut(collection).get_mut(id) {
            doc.body = body;
        }
    }
}

/// Snapshot layout on disk: collection -> [(id, document)] in insertion order.
type Snapshot = BTreeMap<String, Vec<(String, Value)>>;

/// Embedded JSON document store.
///
/// Collections hold JSON documents addressed by id and queried by top-level
/// field equality. Every mutating call runs under a single write lock, so
/// conditional inserts, read-modify-write updates and counter increments are
/// atomic with respect to each other.
#[derive(Debug)]
pub struct DocumentStore {
    inner: RwLock<Collections>,
    snapshot_path: Option<PathBuf>,
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(Collections::default()),
            snapshot_path: None,
        }
    }

    /// Opens a store persisted to `path`, loading the snapshot if one exists.
    ///
    /// Every mutation rewrites the whole snapshot synchronously while holding
    /// the write lock, so each write costs O(store size) in blocking file IO.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut collections = Collections::default();

        if path.exists() {
            let raw = fs::read(&path)
                .with_context(|| format!("failed to read store snapshot {}", path.display()))?;
            let snapshot: Snapshot = serde_json::from_slice(&raw)
                .with_context(|| format!("corrupt store snapshot {}", path.display()))?;
            for (name, docs) in snapshot {
                for (id, body) in docs {
                    collections.push(&name, &id, body);
                }
            }
        }

        Ok(Self {
            inner: RwLock::new(collections),
            snapshot_path: Some(path),
        })
    }

    fn read(&self) -> anyhow::Result<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("document store lock poisoned"))
    }

    fn write(&self) -> anyhow::Result<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("document store lock poisoned"))
    }

    /// Rewrites the snapshot file. Called with the write lock held so
    /// snapshots are written in mutation order.
    fn persist(&self, collections: &Collections) -> anyhow::Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let mut snapshot = Snapshot::new();
        for (name, docs) in &collections.by_name {
            let mut ordered: Vec<(&String, &Document)> = docs.iter().collect();
            ordered.sort_by_key(|(_, doc)| doc.seq);
            snapshot.insert(
                name.clone(),
                ordered
                    .into_iter()
                    .map(|(id, doc)| (id.clone(), doc.body.clone()))
                    .collect(),
            );
        }

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(&snapshot)?)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Persists the mutated state, undoing the in-memory change with
    /// `rollback` when the snapshot cannot be written.
    fn commit(
        &self,
        collections: &mut Collections,
        rollback: impl FnOnce(&mut Collections),
    ) -> anyhow::Result<()> {
        if let Err(e) = self.persist(collections) {
            rollback(collections);
            return Err(e);
        }
        Ok(())
    }

    /// Cheap liveness probe used by the health endpoint.
    pub fn ping(&self) -> anyhow::Result<()> {
        self.read().map(|_| ())
    }

    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> anyhow::Result<Option<T>> {
        let guard = self.read()?;
        match guard.collection(collection).and_then(|c| c.get(id)) {
            Some(doc) => Ok(Some(decode(collection, &doc.body)?)),
            None => Ok(None),
        }
    }

    /// First document (in insertion order) whose `field` equals `value`.
    pub fn find_one<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> anyhow::Result<Option<T>> {
        let guard = self.read()?;
        let Some(docs) = guard.collection(collection) else {
            return Ok(None);
        };
        docs.values()
            .filter(|doc| field_equals(&doc.body, field, value))
            .min_by_key(|doc| doc.seq)
            .map(|doc| decode(collection, &doc.body))
            .transpose()
    }

    pub fn exists(&self, collection: &str, field: &str, value: &str) -> anyhow::Result<bool> {
        let guard = self.read()?;
        Ok(guard
            .collection(collection)
            .map(|docs| docs.values().any(|doc| field_equals(&doc.body, field, value)))
            .unwrap_or(false))
    }

    /// Every document of the collection ordered by `order_by`.
    pub fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
    ) -> anyhow::Result<Vec<T>> {
        self.select(collection, |_| true, order_by, direction)
    }

    /// Documents whose `field` equals `value`, ordered by `order_by`.
    pub fn query<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        order_by: &str,
        direction: Direction,
    ) -> anyhow::Result<Vec<T>> {
        self.select(collection, |body| field_equals(body, field, value), order_by, direction)
    }

    fn select<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: impl Fn(&Value) -> bool,
        order_by: &str,
        direction: Direction,
    ) -> anyhow::Result<Vec<T>> {
        let guard = self.read()?;
        let Some(docs) = guard.collection(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&Document> = docs.values().filter(|doc| filter(&doc.body)).collect();
        matched.sort_by(|a, b| {
            let ord = compare_values(a.body.get(order_by), b.body.get(order_by))
                .then(a.seq.cmp(&b.seq));
            match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });

        matched
            .into_iter()
            .map(|doc| decode(collection, &doc.body))
            .collect()
    }

    /// Inserts or replaces the document stored under `id`.
    pub fn insert<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> anyhow::Result<()> {
        let body = serde_json::to_value(doc)?;
        let mut guard = self.write()?;
        let previous = match guard.collection_mut(collection).get_mut(id) {
            Some(existing) => Some(std::mem::replace(&mut existing.body, body)),
            None => {
                guard.push(collection, id, body);
                None
            }
        };
        self.commit(&mut guard, |c| match previous {
            Some(old) => c.set_body(collection, id, old),
            None => c.remove(collection, id),
        })
    }

    /// Conditional write: stores `doc` only when no document of the
    /// collection has `unique_field` equal to `unique_value`.
    /// Returns false, writing nothing, when the value is taken.
    pub fn insert_unique<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        unique_field: &str,
        unique_value: &str,
        doc: &T,
    ) -> anyhow::Result<bool> {
        let body = serde_json::to_value(doc)?;
        let mut guard = self.write()?;
        let taken = guard
            .collection(collection)
            .map(|docs| docs.values().any(|d| field_equals(&d.body, unique_field, unique_value)))
            .unwrap_or(false);
        if taken {
            return Ok(false);
        }
        guard.push(collection, id, body);
        self.commit(&mut guard, |c| c.remove(collection, id))?;
        Ok(true)
    }

    /// Read-modify-write of the first document whose `field` equals `value`.
    /// `apply` sees the typed document; its changes are written back before
    /// the lock is released. Returns None when nothing matched.
    pub fn update_where<T, R>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        apply: impl FnOnce(&mut T) -> R,
    ) -> anyhow::Result<Option<R>>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut guard = self.write()?;
        let Some(id) = guard
            .collection(collection)
            .and_then(|docs| {
                docs.iter()
                    .filter(|(_, doc)| field_equals(&doc.body, field, value))
                    .min_by_key(|(_, doc)| doc.seq)
            })
            .map(|(id, _)| id.clone())
        else {
            return Ok(None);
        };

        self.apply_update(&mut guard, collection, &id, apply)
    }

    /// Same as [`update_where`](Self::update_where) addressed by document id.
    pub fn update<T, R>(
        &self,
        collection: &str,
        id: &str,
        apply: impl FnOnce(&mut T) -> R,
    ) -> anyhow::Result<Option<R>>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut guard = self.write()?;
        self.apply_update(&mut guard, collection, id, apply)
    }

    fn apply_update<T, R>(
        &self,
        collections: &mut Collections,
        collection: &str,
        id: &str,
        apply: impl FnOnce(&mut T) -> R,
    ) -> anyhow::Result<Option<R>>
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(doc) = collections.collection_mut(collection).get_mut(id) else {
            return Ok(None);
        };

        let mut typed: T = decode(collection, &doc.body)?;
        let result = apply(&mut typed);
        let previous = std::mem::replace(&mut doc.body, serde_json::to_value(&typed)?);
        self.commit(collections, |c| c.set_body(collection, id, previous))?;
        Ok(Some(result))
    }

    /// Adds `delta` to the integer `field` of document `id` (a missing field
    /// counts as 0). Returns the new value, or None if the document is absent.
    pub fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> anyhow::Result<Option<i64>> {
        let mut guard = self.write()?;
        let Some(doc) = guard.collection_mut(collection).get_mut(id) else {
            return Ok(None);
        };

        let object = doc
            .body
            .as_object_mut()
            .ok_or_else(|| anyhow!("{}/{} is not a JSON object", collection, id))?;
        let current = match object.get(field) {
            None | Some(Value::Null) => 0,
            Some(v) => v
                .as_i64()
                .ok_or_else(|| anyhow!("{}/{}.{} is not an integer", collection, id, field))?,
        };
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| anyhow!("{}/{}.{} would overflow", collection, id, field))?;
        let previous = object.insert(field.to_string(), Value::from(updated));
        self.commit(&mut guard, |c| {
            let restore = c
                .collection_mut(collection)
                .get_mut(id)
                .and_then(|doc| doc.body.as_object_mut());
            if let Some(object) = restore {
                match previous {
                    Some(old) => object.insert(field.to_string(), old),
                    None => object.remove(field),
                };
            }
        })?;
        Ok(Some(updated))
    }

    pub fn count(&self, collection: &str) -> anyhow::Result<usize> {
        let guard = self.read()?;
        Ok(guard.collection(collection).map(|c| c.len()).unwrap_or(0))
    }

    /// Drops every collection.
    pub fn clear(&self) -> anyhow::Result<()> {
        let mut guard = self.write()?;
        let previous = std::mem::take(&mut guard.by_name);
        self.commit(&mut guard, |c| c.by_name = previous)
    }
}

fn decode<T: DeserializeOwned>(collection: &str, body: &Value) -> anyhow::Result<T> {
    T::deserialize(body).with_context(|| format!("malformed document in '{}'", collection))
}

fn field_equals(body: &Value, field: &str, value: &str) -> bool {
    matches!(body.get(field), Some(Value::String(s)) if s == value)
}

/// Timestamps chronologically, numbers numerically, other strings lexically.
/// Missing values sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                chrono::DateTime::parse_from_rfc3339(x),
                chrono::DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(tx), Ok(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

pub const DEMO_EMAIL: &str = "demo@insighthub.dev";
const DEMO_PASSWORD: &str = "Demo@1234";

/// Seeds a demo account and a welcome post. Does nothing if the demo
/// account already exists.
pub fn init_demo_data(store: &DocumentStore) -> anyhow::Result<()> {
    if store.exists(USERS_COLLECTION, "email", DEMO_EMAIL)? {
        return Ok(());
    }

    let user_id = new_id();
    let user = User {
        id: user_id.clone(),
        full_name: "Demo Writer".to_string(),
        username: "demo".to_string(),
        email: DEMO_EMAIL.to_string(),
        password: hash_password(DEMO_PASSWORD)?,
        created_at: now_iso(),
        no_of_blogs: 1,
        followers: 0,
        followings: 0,
    };
    if !store.insert_unique(USERS_COLLECTION, &user_id, "email", DEMO_EMAIL, &user)? {
        return Ok(());
    }

    let blog_id = new_id();
    let now = now_iso();
    let blog = Blog {
        id: blog_id.clone(),
        title: "Welcome to Insight Hub".to_string(),
        blog_content: "This is the first post on Insight Hub. Write, like and comment away!"
            .to_string(),
        author_id: user_id,
        created_at: now.clone(),
        updated_at: now,
        tags: vec!["welcome".to_string()],
        blog_image: String::new(),
        category: "General".to_string(),
        views: 0,
        likes: 0,
        comments: 0,
        liked_by: Vec::new(),
        featured: true,
        trending: false,
    };
    store.insert_unique(BLOGS_COLLECTION, &blog_id, "title", &blog.title, &blog)?;

    tracing::info!(email = DEMO_EMAIL, "seeded demo data");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Note {
        id: String,
        title: String,
        created_at: String,
        #[serde(default)]
        hits: i64,
    }

    fn note(id: &str, title: &str, created_at: &str) -> Note {
        Note {
            id: id.to_string(),
            title: title.to_string(),
            created_at: created_at.to_string(),
            hits: 0,
        }
    }

    #[test]
    fn insert_unique_rejects_taken_value() {
        let store = DocumentStore::in_memory();
        let a = note("a", "same", "2026-01-01T00:00:00Z");
        let b = note("b", "same", "2026-01-02T00:00:00Z");

        assert!(store.insert_unique("notes", "a", "title", "same", &a).unwrap());
        assert!(!store.insert_unique("notes", "b", "title", "same", &b).unwrap());
        assert_eq!(store.count("notes").unwrap(), 1);
        assert_eq!(store.get::<Note>("notes", "b").unwrap(), None);
    }

    #[test]
    fn list_orders_timestamps_chronologically() {
        let store = DocumentStore::in_memory();
        // Different fractional precision would mis-sort lexically.
        store.insert("notes", "a", &note("a", "first", "2026-01-01T10:00:00Z")).unwrap();
        store.insert("notes", "b", &note("b", "second", "2026-01-01T10:00:00.5Z")).unwrap();
        store.insert("notes", "c", &note("c", "third", "2026-01-01T11:00:00+00:00")).unwrap();

        let desc: Vec<Note> = store.list("notes", "created_at", Direction::Desc).unwrap();
        let titles: Vec<&str> = desc.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);

        let asc: Vec<Note> = store.list("notes", "created_at", Direction::Asc).unwrap();
        assert_eq!(asc[0].title, "first");
    }

    #[test]
    fn ties_keep_insertion_order() {
        let store = DocumentStore::in_memory();
        for id in ["z", "a", "m"] {
            store.insert("notes", id, &note(id, id, "2026-01-01T00:00:00Z")).unwrap();
        }
        let asc: Vec<Note> = store.list("notes", "created_at", Direction::Asc).unwrap();
        let ids: Vec<&str> = asc.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn query_filters_on_field() {
        let store = DocumentStore::in_memory();
        store.insert("c", "1", &json!({"blog_id": "x", "created_at": "2026-01-02T00:00:00Z"})).unwrap();
        store.insert("c", "2", &json!({"blog_id": "y", "created_at": "2026-01-01T00:00:00Z"})).unwrap();
        store.insert("c", "3", &json!({"blog_id": "x", "created_at": "2026-01-01T00:00:00Z"})).unwrap();

        let rows: Vec<Value> = store.query("c", "blog_id", "x", "created_at", Direction::Asc).unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r["created_at"].as_str().unwrap()).collect();
        assert_eq!(dates, vec!["2026-01-01T00:00:00Z", "2026-01-02T00:00:00Z"]);
        assert!(store.query::<Value>("missing", "blog_id", "x", "created_at", Direction::Asc)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn increment_counts_from_zero_and_reports_missing() {
        let store = DocumentStore::in_memory();
        store.insert("c", "1", &json!({"name": "n"})).unwrap();
        assert_eq!(store.increment("c", "1", "views", 1).unwrap(), Some(1));
        assert_eq!(store.increment("c", "1", "views", 1).unwrap(), Some(2));
        assert_eq!(store.increment("c", "nope", "views", 1).unwrap(), None);

        store.insert("c", "2", &json!({"views": "many"})).unwrap();
        assert!(store.increment("c", "2", "views", 1).is_err());
    }

    #[test]
    fn update_where_writes_back_changes() {
        let store = DocumentStore::in_memory();
        store.insert("notes", "a", &note("a", "t", "2026-01-01T00:00:00Z")).unwrap();

        let hits = store
            .update_where("notes", "title", "t", |n: &mut Note| {
                n.hits += 5;
                n.hits
            })
            .unwrap();
        assert_eq!(hits, Some(5));
        assert_eq!(store.get::<Note>("notes", "a").unwrap().unwrap().hits, 5);

        let none = store
            .update_where("notes", "title", "other", |n: &mut Note| n.hits)
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn snapshot_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("insight-hub-{}", new_id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("store.json");

        {
            let store = DocumentStore::open(&path).unwrap();
            store.insert("notes", "a", &note("a", "one", "2026-01-01T00:00:00Z")).unwrap();
            store.insert("notes", "b", &note("b", "two", "2026-01-01T00:00:00Z")).unwrap();
            store.increment("notes", "a", "hits", 3).unwrap();
        }

        let reopened = DocumentStore::open(&path).unwrap();
        assert_eq!(reopened.get::<Note>("notes", "a").unwrap().unwrap().hits, 3);
        let asc: Vec<Note> = reopened.list("notes", "created_at", Direction::Asc).unwrap();
        assert_eq!(asc.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failed_snapshot_write_leaves_memory_untouched() {
        let dir = std::env::temp_dir().join(format!("insight-hub-{}", new_id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("store.json");
        let store = DocumentStore::open(&path).unwrap();
        store.insert("notes", "a", &note("a", "one", "2026-01-01T00:00:00Z")).unwrap();

        // A directory where the temp snapshot goes makes every write fail.
        let blocker = path.with_extension("tmp");
        fs::create_dir(&blocker).unwrap();

        let b = note("b", "two", "2026-01-02T00:00:00Z");
        assert!(store.insert_unique("notes", "b", "title", "two", &b).is_err());
        assert!(store.insert("notes", "c", &note("c", "three", "2026-01-03T00:00:00Z")).is_err());
        assert!(store.insert("notes", "a", &note("a", "renamed", "2026-01-01T00:00:00Z")).is_err());
        assert!(store.increment("notes", "a", "hits", 1).is_err());
        assert!(store
            .update_where("notes", "title", "one", |n: &mut Note| n.hits = 7)
            .is_err());
        assert!(store.clear().is_err());

        assert_eq!(store.count("notes").unwrap(), 1);
        assert_eq!(store.get::<Note>("notes", "b").unwrap(), None);
        assert_eq!(
            store.get::<Note>("notes", "a").unwrap(),
            Some(note("a", "one", "2026-01-01T00:00:00Z"))
        );

        // Once the disk recovers the same writes go through.
        fs::remove_dir(&blocker).unwrap();
        assert!(store.insert_unique("notes", "b", "title", "two", &b).unwrap());
        assert_eq!(store.increment("notes", "a", "hits", 1).unwrap(), Some(1));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn increment_refuses_to_overflow() {
        let store = DocumentStore::in_memory();
        store.insert("c", "1", &json!({"views": i64::MAX})).unwrap();
        assert!(store.increment("c", "1", "views", 1).is_err());
        let doc: Value = store.get("c", "1").unwrap().unwrap();
        assert_eq!(doc["views"], i64::MAX);
    }

    #[test]
    fn demo_data_is_seeded_once() {
        let store = DocumentStore::in_memory();
        init_demo_data(&store).unwrap();
        init_demo_data(&store).unwrap();
        assert_eq!(store.count(USERS_COLLECTION).unwrap(), 1);
        assert_eq!(store.count(BLOGS_COLLECTION).unwrap(), 1);

        store.clear().unwrap();
        assert_eq!(store.count(USERS_COLLECTION).unwrap(), 0);
    }
}
