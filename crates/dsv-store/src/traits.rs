/// Core trait for namespaced key-value persistence.
///
/// Every backend implements this trait. It provides simple key-value
/// operations scoped by a namespace (analogous to a table).
///
/// Values are opaque bytes: the store never interprets record payloads.
/// Encoding, versioning and migration are handled by
/// [`dsv-migrate`](https://docs.rs/dsv-migrate).
pub trait StateStore {
    /// Error type for this backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store a value under `(namespace, key)`.
    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), Self::Error>;

    /// Retrieve a value by `(namespace, key)`.
    /// Returns `None` if the key does not exist.
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Delete a value by `(namespace, key)`. Deleting a missing key is not an error.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), Self::Error>;

    /// List all keys in a namespace, in the backend's native key order.
    fn list_keys(&self, namespace: &str) -> Result<Vec<String>, Self::Error>;

    /// Check if a key exists in a namespace.
    fn exists(&self, namespace: &str, key: &str) -> Result<bool, Self::Error> {
        Ok(self.get(namespace, key)?.is_some())
    }
}
