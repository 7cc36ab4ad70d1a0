// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Shared test type: a keyed message with a string payload.

use kdds::core::{ReturnCode, Result, TopicType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg {
    pub id: u32,
    pub msg: String,
}

impl Msg {
    pub fn new(id: u32, msg: &str) -> Self {
        Msg {
            id,
            msg: msg.to_string(),
        }
    }
}

impl TopicType for Msg {
    fn type_name() -> &'static str {
        "kdds_tests::Msg"
    }

    fn has_key() -> bool {
        true
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&(self.msg.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.msg.as_bytes());
        Ok(())
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < 8 {
            return Err(ReturnCode::BadParameter);
        }
        let id = u32::from_le_bytes(buf[0..4].try_into().map_err(|_| ReturnCode::Error)?);
        let len =
            u32::from_le_bytes(buf[4..8].try_into().map_err(|_| ReturnCode::Error)?) as usize;
        if buf.len() < 8 + len {
            return Err(ReturnCode::BadParameter);
        }
        let msg = String::from_utf8(buf[8..8 + len].to_vec())
            .map_err(|_| ReturnCode::BadParameter)?;
        Ok(Msg { id, msg })
    }

    fn key_bytes(&self) -> Vec<u8> {
        self.id.to_le_bytes().to_vec()
    }
}
