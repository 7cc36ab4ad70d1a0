// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Instance-identifier generator.
//!
//! Produces process-unique 64-bit identifiers used as opaque instance
//! handles. Each call increments a counter and runs the value through TEA
//! (64-bit block, 128-bit key, 32 rounds), so successive handles look
//! unrelated and cannot be mistaken for structured data. The key mixes the
//! address of a process static, the startup wall-clock time, and a fixed
//! sentinel word; this is deliberately not cryptographic, it only has to
//! discourage clients from deriving meaning from handle values.
//!
//! The counter is seeded with the decryption of zero, so the first handle
//! handed out is `encrypt(1)` and zero is never produced.

use crate::core::time::Time;
use parking_lot::Mutex;
use std::sync::OnceLock;

const TEA_DELTA: u32 = 0x9e37_79b9;
const TEA_ROUNDS: u32 = 32;

fn tea_encrypt(v: [u32; 2], k: &[u32; 4]) -> [u32; 2] {
    let (mut v0, mut v1) = (v[0], v[1]);
    let mut sum = 0u32;
    for _ in 0..TEA_ROUNDS {
        sum = sum.wrapping_add(TEA_DELTA);
        v0 = v0.wrapping_add(
            ((v1 << 4).wrapping_add(k[0])) ^ (v1.wrapping_add(sum)) ^ ((v1 >> 5).wrapping_add(k[1])),
        );
        v1 = v1.wrapping_add(
            ((v0 << 4).wrapping_add(k[2])) ^ (v0.wrapping_add(sum)) ^ ((v0 >> 5).wrapping_add(k[3])),
        );
    }
    [v0, v1]
}

fn tea_decrypt(v: [u32; 2], k: &[u32; 4]) -> [u32; 2] {
    let (mut v0, mut v1) = (v[0], v[1]);
    let mut sum = 0xC6EF_3720u32;
    for _ in 0..TEA_ROUNDS {
        v1 = v1.wrapping_sub(
            ((v0 << 4).wrapping_add(k[2])) ^ (v0.wrapping_add(sum)) ^ ((v0 >> 5).wrapping_add(k[3])),
        );
        v0 = v0.wrapping_sub(
            ((v1 << 4).wrapping_add(k[0])) ^ (v1.wrapping_add(sum)) ^ ((v1 >> 5).wrapping_add(k[1])),
        );
        sum = sum.wrapping_sub(TEA_DELTA);
    }
    [v0, v1]
}

fn split(v: u64) -> [u32; 2] {
    [v as u32, (v >> 32) as u32]
}

fn join(v: [u32; 2]) -> u64 {
    u64::from(v[0]) | (u64::from(v[1]) << 32)
}

struct IidState {
    key: [u32; 4],
    counter: u64,
}

/// Process-wide instance-id generator.
pub struct IidGenerator {
    state: Mutex<IidState>,
}

// Entropy anchor: its address feeds the key.
static IID_ANCHOR: u8 = 0;

impl IidGenerator {
    fn new() -> Self {
        let tnow = Time::now().nanos() as u64;
        let key = [
            std::ptr::addr_of!(IID_ANCHOR) as usize as u32,
            tnow as u32,
            (tnow >> 32) as u32,
            0xdead_beef,
        ];
        // Seed so that the first generated value is encrypt(1).
        let counter = join(tea_decrypt(split(0), &key));
        IidGenerator {
            state: Mutex::new(IidState { key, counter }),
        }
    }

    /// Generate the next identifier.
    pub fn next(&self) -> u64 {
        let mut st = self.state.lock();
        st.counter = st.counter.wrapping_add(1);
        join(tea_encrypt(split(st.counter), &st.key))
    }
}

/// The process-wide generator instance.
pub fn iid_generator() -> &'static IidGenerator {
    static GEN: OnceLock<IidGenerator> = OnceLock::new();
    GEN.get_or_init(IidGenerator::new)
}
