// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Type registry: per-type serializer dispatch and key extraction.
//!
//! Application types implement [`TopicType`]; the core never sees the
//! concrete type, only a [`TypeDescriptor`] carrying the type name, a
//! 14-byte MD5 [`TypeId`] and the erased key-extraction function. Keys are
//! plain byte strings compared lexicographically; two samples belong to
//! the same instance iff their key bytes are equal.

use crate::core::retcode::{ReturnCode, Result};
use dashmap::DashMap;
use md5::{Digest, Md5};
use std::sync::{Arc, OnceLock};

/// Type identifier: truncated MD5 of the type name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId([u8; 14]);

impl TypeId {
    /// Compute the id for a type name.
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Self {
        let mut hasher = Md5::new();
        hasher.update(type_name.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 14];
        bytes.copy_from_slice(&digest[..14]);
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 14] {
        &self.0
    }
}

impl std::fmt::Debug for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeId(")?;
        for byte in &self.0[..4] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "...)")
    }
}

/// Contract between application types and the core.
///
/// `encode`/`decode` move payloads across the cache boundary; `key_bytes`
/// produces the instance key for keyed types. Keyless types use the empty
/// key, putting every sample in one instance.
pub trait TopicType: Send + Sync + Sized + 'static {
    /// Stable type name used for matching and registration.
    fn type_name() -> &'static str;

    /// Whether the type declares key fields.
    #[must_use]
    fn has_key() -> bool {
        false
    }

    /// Serialize into `buf`.
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()>;

    /// Deserialize from a full payload buffer.
    fn decode(buf: &[u8]) -> Result<Self>;

    /// Serialized key fields. Must be stable for a given logical instance.
    #[must_use]
    fn key_bytes(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// 32-bit key hash (FNV-1a over the key bytes).
#[must_use]
pub fn hash_key(key: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in key {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

type KeyExtractFn = dyn Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync;

/// Erased per-type dispatch record.
pub struct TypeDescriptor {
    /// Stable type name.
    pub type_name: String,
    /// MD5-derived identity.
    pub type_id: TypeId,
    /// Whether instances are keyed.
    pub has_key: bool,
    extract_key: Box<KeyExtractFn>,
}

impl TypeDescriptor {
    /// Build the descriptor for a [`TopicType`].
    #[must_use]
    pub fn of<T: TopicType>() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor {
            type_name: T::type_name().to_string(),
            type_id: TypeId::from_type_name(T::type_name()),
            has_key: T::has_key(),
            extract_key: Box::new(|payload| {
                if !T::has_key() {
                    return Ok(Vec::new());
                }
                let value = T::decode(payload)?;
                Ok(value.key_bytes())
            }),
        })
    }

    /// Extract the instance key from a serialized payload.
    pub fn extract_key(&self, payload: &[u8]) -> Result<Vec<u8>> {
        (self.extract_key)(payload)
    }

    /// Two descriptors describe the same type iff name and keyedness agree.
    #[must_use]
    pub fn compatible_with(&self, other: &TypeDescriptor) -> bool {
        self.type_id == other.type_id && self.has_key == other.has_key
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("type_id", &self.type_id)
            .field("has_key", &self.has_key)
            .finish()
    }
}

/// Process-wide descriptor registry keyed by [`TypeId`].
pub struct TypeRegistry {
    types: DashMap<TypeId, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    fn new() -> Self {
        TypeRegistry {
            types: DashMap::new(),
        }
    }

    /// Register (or re-register) a descriptor. Re-registration with a
    /// conflicting definition fails with `InconsistentPolicy`.
    pub fn register(&self, desc: &Arc<TypeDescriptor>) -> Result<Arc<TypeDescriptor>> {
        if let Some(existing) = self.types.get(&desc.type_id) {
            if !existing.compatible_with(desc) {
                return Err(ReturnCode::InconsistentPolicy);
            }
            return Ok(Arc::clone(existing.value()));
        }
        self.types.insert(desc.type_id, Arc::clone(desc));
        Ok(Arc::clone(desc))
    }

    /// Look up a registered descriptor.
    #[must_use]
    pub fn lookup(&self, type_id: TypeId) -> Option<Arc<TypeDescriptor>> {
        self.types.get(&type_id).map(|e| Arc::clone(e.value()))
    }
}

/// The process-wide registry instance.
pub fn type_registry() -> &'static TypeRegistry {
    static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(TypeRegistry::new)
}
