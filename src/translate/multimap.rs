//! Ordered multi-valued map.
//!
//! Shared shape for request headers, form parameters and query parameters:
//! each key maps to an ordered list of values and keys keep their insertion
//! order. Keys are compared exactly; callers that need case-insensitive
//! lookups normalize names before inserting (see [`super::headers`]).

use indexmap::IndexMap;

/// Insertion-ordered `key -> [value, ...]` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiMap {
    entries: IndexMap<String, Vec<String>>,
}

impl MultiMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to the list for `key`, creating the entry if needed.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_default().push(value.into());
    }

    /// Append every value to the list for `key`.
    pub fn add_all<I, V>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let list = self.entries.entry(key.into()).or_default();
        list.extend(values.into_iter().map(Into::into));
    }

    /// Replace the entire value list for `key` with a single value.
    pub fn put_single(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), vec![value.into()]);
    }

    /// Replace the entire value list for `key`, returning the previous list.
    pub fn put(&mut self, key: impl Into<String>, values: Vec<String>) -> Option<Vec<String>> {
        self.entries.insert(key.into(), values)
    }

    /// All values for `key`, in insertion order.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// First value for `key`.
    pub fn get_first(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Remove every key equal to `key` ignoring ASCII case.
    pub fn remove_ignore_case(&mut self, key: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.entries.retain(|k, values| {
            if k.eq_ignore_ascii_case(key) {
                removed.append(values);
                false
            } else {
                true
            }
        });
        removed
    }

    /// Find a key ignoring ASCII case, returning its values.
    pub fn get_ignore_case(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, values)| values.as_slice())
    }
}

impl<K, V> FromIterator<(K, V)> for MultiMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = MultiMap::new();
        for (key, value) in iter {
            map.add(key, value);
        }
        map
    }
}

impl<'a> IntoIterator for &'a MultiMap {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = indexmap::map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
