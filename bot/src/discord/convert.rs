//! Identifier conversions between serenity and the engines.

use serenity::all as sdk;
use triage_core::ids;

macro_rules! id_conversions {
    ($($name:ident),* $(,)?) => {
        /// Engine id to serenity id.
        pub trait ToSdk {
            /// Serenity counterpart
            type Sdk;
            /// Convert.
            fn to_sdk(self) -> Self::Sdk;
        }

        /// Serenity id to engine id.
        pub trait FromSdk<T> {
            /// Convert.
            fn from_sdk(id: T) -> Self;
        }

        $(
            impl ToSdk for ids::$name {
                type Sdk = sdk::$name;

                fn to_sdk(self) -> sdk::$name {
                    sdk::$name::new(self.get())
                }
            }

            impl FromSdk<sdk::$name> for ids::$name {
                fn from_sdk(id: sdk::$name) -> Self {
                    Self::new(id.get())
                }
            }
        )*
    };
}

id_conversions!(GuildId, ChannelId, MessageId, UserId, RoleId);
