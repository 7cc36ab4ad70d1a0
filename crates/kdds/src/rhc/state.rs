// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Sample, view and instance states with their read/take masks.

use crate::core::guid::Guid;
use crate::core::time::Time;

/// Sample state: whether this reader has seen the sample via `read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleState {
    /// Not yet returned by `read` or `take`.
    NotRead,
    /// Returned by a previous `read`.
    Read,
}

/// View state: whether the instance is new to this reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Instance created (or revived) since the last read/take of it.
    New,
    /// Instance already accessed before.
    NotNew,
}

/// Instance state as observed by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// At least one live writer publishes the instance.
    Alive,
    /// A writer disposed the instance.
    NotAliveDisposed,
    /// Every writer unregistered (or went away) without disposing.
    NotAliveNoWriters,
}

macro_rules! state_mask {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $bit:expr;)+ } any = $any:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(u32);

        impl $name {
            $( $(#[$vmeta])* pub const $variant: $name = $name($bit); )+

            /// All states.
            pub const ANY: $name = $name($any);

            #[must_use]
            pub const fn from_bits(bits: u32) -> Self {
                $name(bits)
            }

            #[must_use]
            pub const fn bits(&self) -> u32 {
                self.0
            }

            #[must_use]
            pub const fn contains(&self, other: $name) -> bool {
                (self.0 & other.0) == other.0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }
    };
}

state_mask! {
    /// Mask over [`SampleState`].
    SampleStateMask {
        /// Matches READ samples.
        READ = 1 << 0;
        /// Matches NOT_READ samples.
        NOT_READ = 1 << 1;
    }
    any = (1 << 0) | (1 << 1)
}

state_mask! {
    /// Mask over [`ViewState`].
    ViewStateMask {
        /// Matches NEW instances.
        NEW = 1 << 0;
        /// Matches NOT_NEW instances.
        NOT_NEW = 1 << 1;
    }
    any = (1 << 0) | (1 << 1)
}

state_mask! {
    /// Mask over [`InstanceState`].
    InstanceStateMask {
        /// Matches ALIVE instances.
        ALIVE = 1 << 0;
        /// Matches NOT_ALIVE_DISPOSED instances.
        NOT_ALIVE_DISPOSED = 1 << 1;
        /// Matches NOT_ALIVE_NO_WRITERS instances.
        NOT_ALIVE_NO_WRITERS = 1 << 2;
    }
    any = (1 << 0) | (1 << 1) | (1 << 2)
}

impl SampleStateMask {
    #[must_use]
    pub fn matches(&self, state: SampleState) -> bool {
        match state {
            SampleState::Read => self.contains(SampleStateMask::READ),
            SampleState::NotRead => self.contains(SampleStateMask::NOT_READ),
        }
    }
}

impl ViewStateMask {
    #[must_use]
    pub fn matches(&self, state: ViewState) -> bool {
        match state {
            ViewState::New => self.contains(ViewStateMask::NEW),
            ViewState::NotNew => self.contains(ViewStateMask::NOT_NEW),
        }
    }
}

impl InstanceStateMask {
    #[must_use]
    pub fn matches(&self, state: InstanceState) -> bool {
        match state {
            InstanceState::Alive => self.contains(InstanceStateMask::ALIVE),
            InstanceState::NotAliveDisposed => self.contains(InstanceStateMask::NOT_ALIVE_DISPOSED),
            InstanceState::NotAliveNoWriters => {
                self.contains(InstanceStateMask::NOT_ALIVE_NO_WRITERS)
            }
        }
    }
}

/// Combined (sample, view, instance) state selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMask {
    pub sample: SampleStateMask,
    pub view: ViewStateMask,
    pub instance: InstanceStateMask,
}

impl StateMask {
    /// Matches everything.
    pub const ANY: StateMask = StateMask {
        sample: SampleStateMask::ANY,
        view: ViewStateMask::ANY,
        instance: InstanceStateMask::ANY,
    };

    /// Matches only samples not read yet.
    pub const NOT_READ: StateMask = StateMask {
        sample: SampleStateMask::NOT_READ,
        view: ViewStateMask::ANY,
        instance: InstanceStateMask::ANY,
    };

    #[must_use]
    pub const fn new(
        sample: SampleStateMask,
        view: ViewStateMask,
        instance: InstanceStateMask,
    ) -> Self {
        StateMask {
            sample,
            view,
            instance,
        }
    }
}

/// Metadata attached to every sample handed to the application.
#[derive(Debug, Clone)]
pub struct SampleInfo {
    pub sample_state: SampleState,
    pub view_state: ViewState,
    pub instance_state: InstanceState,
    /// False for dispose/unregister sentinels carrying no payload.
    pub valid_data: bool,
    /// Writer-side timestamp.
    pub source_timestamp: Time,
    /// Reader-side arrival timestamp.
    pub reception_timestamp: Time,
    /// GUID of the publishing writer.
    pub writer_guid: Guid,
    /// Writer-assigned sequence number.
    pub sequence_number: u64,
    /// Opaque instance handle.
    pub instance_handle: u64,
    /// Times the instance transitioned out of NOT_ALIVE_DISPOSED before
    /// this sample was received.
    pub disposed_generation_count: u32,
    /// Times the instance transitioned out of NOT_ALIVE_NO_WRITERS before
    /// this sample was received.
    pub no_writers_generation_count: u32,
    /// Newer samples of the same instance in the returned collection.
    pub sample_rank: u32,
    /// Generation distance to the most recent sample in the collection.
    pub generation_rank: u32,
    /// Generation distance to the instance's current generation.
    pub absolute_generation_rank: u32,
}
