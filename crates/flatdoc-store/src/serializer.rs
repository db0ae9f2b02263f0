//! Pluggable document encoders.
//!
//! The store never inspects document bytes; it hands values to a
//! [`Serializer`] on the way out and asks it for values on the way back in.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// Converts documents to bytes and back.
pub trait Serializer<V>: Send + Sync {
    /// Encode a document.
    fn serialize(&self, value: &V) -> StoreResult<Vec<u8>>;

    /// Decode a document previously produced by [`Serializer::serialize`].
    fn deserialize(&self, bytes: &[u8]) -> StoreResult<V>;
}

/// JSON encoding via `serde_json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer {
    /// Write indented JSON (handy when documents are inspected by hand).
    pub pretty: bool,
}

impl JsonSerializer {
    /// Compact JSON output.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented JSON output.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl<V> Serializer<V> for JsonSerializer
where
    V: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &V) -> StoreResult<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded.map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> StoreResult<V> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// Compact binary encoding via `bincode`.
///
/// Bincode is not self-describing, so `V` must be a concrete type rather
/// than something like `serde_json::Value`.
pub struct BincodeSerializer<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> BincodeSerializer<V> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<V> Default for BincodeSerializer<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for BincodeSerializer<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BincodeSerializer")
    }
}

impl<V> Serializer<V> for BincodeSerializer<V>
where
    V: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &V) -> StoreResult<Vec<u8>> {
        bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> StoreResult<V> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}
