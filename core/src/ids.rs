//! Typed identifiers for platform objects.
//!
//! The chat platform hands out 64-bit snowflakes for every object. Wrapping
//! them keeps a channel id from being passed where a role id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw snowflake.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw snowflake.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake!(
    /// A guild (community server).
    GuildId
);
snowflake!(
    /// A text channel, voice channel, category or thread.
    ChannelId
);
snowflake!(
    /// A message.
    MessageId
);
snowflake!(
    /// A user account.
    UserId
);
snowflake!(
    /// A guild role.
    RoleId
);
