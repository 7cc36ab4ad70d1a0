// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! 128-bit entity GUIDs.
//!
//! A GUID is a 12-byte process prefix plus a 4-byte entity id. The prefix
//! base is derived once per process by hashing a random-ish seed (startup
//! wall-clock time, process id, the address of a static); participants in
//! the same process share the first 8 prefix bytes and differ in a
//! per-participant counter occupying the last 4. The entity id carries a
//! 24-bit key and a kind code in the low byte.

use crate::core::time::Time;
use md5::{Digest, Md5};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// Entity-kind code stored in the low byte of the entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GuidKind {
    Participant = 0xc1,
    Topic = 0x45,
    Publisher = 0x41,
    Subscriber = 0x42,
    Writer = 0x02,
    Reader = 0x07,
    BuiltinWriter = 0xc2,
    BuiltinReader = 0xc7,
}

/// Globally unique 128-bit entity identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Guid {
    /// Process/participant scoped prefix.
    pub prefix: [u8; 12],
    /// Entity id: 24-bit key + kind byte.
    pub entity_id: [u8; 4],
}

impl Guid {
    /// The nil GUID (all zeros).
    pub const NIL: Guid = Guid {
        prefix: [0; 12],
        entity_id: [0; 4],
    };

    #[must_use]
    pub fn new(prefix: [u8; 12], key: u32, kind: GuidKind) -> Self {
        let k = key.to_be_bytes();
        Guid {
            prefix,
            entity_id: [k[1], k[2], k[3], kind as u8],
        }
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        *self == Guid::NIL
    }

    /// All 16 bytes, prefix first.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..12].copy_from_slice(&self.prefix);
        out[12..].copy_from_slice(&self.entity_id);
        out
    }
}

impl std::fmt::Debug for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.prefix {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ":")?;
        for b in &self.entity_id {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

static PREFIX_ANCHOR: u8 = 0;

fn process_prefix_base() -> &'static [u8; 12] {
    static BASE: OnceLock<[u8; 12]> = OnceLock::new();
    BASE.get_or_init(|| {
        let mut hasher = Md5::new();
        hasher.update(Time::now().nanos().to_le_bytes());
        hasher.update(std::process::id().to_le_bytes());
        hasher.update((std::ptr::addr_of!(PREFIX_ANCHOR) as usize).to_le_bytes());
        let digest = hasher.finalize();
        let mut prefix = [0u8; 12];
        prefix.copy_from_slice(&digest[..12]);
        prefix
    })
}

/// Allocate a fresh participant prefix: process base with a per-participant
/// counter in the last four bytes.
pub fn next_participant_prefix() -> [u8; 12] {
    static COUNTER: AtomicU32 = AtomicU32::new(1);
    let mut prefix = *process_prefix_base();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    prefix[8..12].copy_from_slice(&n.to_be_bytes());
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil() {
        assert!(Guid::NIL.is_nil());
        assert!(!Guid::new([1; 12], 1, GuidKind::Writer).is_nil());
    }

    #[test]
    fn test_kind_in_low_byte() {
        let g = Guid::new([0; 12], 0x00ab_cdef, GuidKind::Reader);
        assert_eq!(g.entity_id, [0xab, 0xcd, 0xef, 0x07]);
    }

    #[test]
    fn test_participant_prefixes_share_base() {
        let a = next_participant_prefix();
        let b = next_participant_prefix();
        assert_eq!(a[..8], b[..8]);
        assert_ne!(a[8..], b[8..]);
    }

    #[test]
    fn test_display_format() {
        let g = Guid::new([0x11; 12], 1, GuidKind::Participant);
        let s = g.to_string();
        assert!(s.contains(':'));
        assert_eq!(s.len(), 12 * 2 + 1 + 4 * 2);
    }

    #[test]
    fn test_to_bytes_layout() {
        let g = Guid::new([7; 12], 0x010203, GuidKind::Writer);
        let bytes = g.to_bytes();
        assert_eq!(&bytes[..12], &[7; 12]);
        assert_eq!(&bytes[12..], &[0x01, 0x02, 0x03, 0x02]);
    }
}
