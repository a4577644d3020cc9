//! Stable numeric identifiers for assets and packages
//!
//! Both identifier types wrap a 32-bit value. They are either given
//! directly or derived by hashing a normalized path, and share one string
//! encoding: eight hex digits of the raw value.
//!
//! ```
//! use assetpack::AssetId;
//!
//! let id = AssetId::from_path("textures/wall.png");
//! assert_eq!(id, AssetId::from_path("/textures//wall.png"));
//!
//! let encoded = id.to_string();
//! assert_eq!(AssetId::parse(&encoded).unwrap(), id);
//! ```

use crate::error::{PackageError, Result};
use crate::path::normalize_path;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Hash a path into a non-zero identifier value
fn hash_path(path: &str) -> i32 {
    let digest = Sha256::digest(normalize_path(path).as_bytes());
    let value = i32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
    // Zero is reserved for NONE
    if value == 0 {
        1
    } else {
        value
    }
}

fn encode(value: i32) -> String {
    hex::encode(value.to_be_bytes())
}

fn decode(text: &str) -> Option<i32> {
    let mut bytes = [0u8; 4];
    hex::decode_to_slice(text, &mut bytes).ok()?;
    Some(i32::from_be_bytes(bytes))
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $expecting:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(i32);

        impl $name {
            /// The reserved "no identifier" value
            pub const NONE: Self = Self(0);

            /// Wrap a raw identifier value
            pub const fn new(value: i32) -> Self {
                Self(value)
            }

            /// Derive an identifier by hashing a path
            ///
            /// The path is normalized first, so `a/b`, `/a/b` and `a\b`
            /// produce the same identifier. The result is never
            /// [`Self::NONE`].
            pub fn from_path(path: &str) -> Self {
                Self(hash_path(path))
            }

            /// Raw identifier value
            pub const fn raw(self) -> i32 {
                self.0
            }

            pub const fn is_none(self) -> bool {
                self.0 == 0
            }

            /// Parse the string encoding produced by `to_string`
            ///
            /// This takes a formatted identifier, not a path.
            pub fn parse(text: &str) -> Result<Self> {
                Self::try_parse(text).ok_or_else(|| PackageError::InvalidId(text.to_string()))
            }

            /// Parse the string encoding, returning `None` on malformed input
            pub fn try_parse(text: &str) -> Option<Self> {
                decode(text).map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = PackageError;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                struct IdVisitor;

                impl<'de> Visitor<'de> for IdVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        f.write_str($expecting)
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<$name, E> {
                        $name::try_parse(v)
                            .ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
                    }

                    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<$name, E> {
                        i32::try_from(v)
                            .map($name)
                            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
                    }

                    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<$name, E> {
                        i32::try_from(v)
                            .map($name)
                            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
                    }
                }

                deserializer.deserialize_any(IdVisitor)
            }
        }
    };
}

define_id!(
    /// Package-local identifier of an asset
    AssetId,
    "an asset id as eight hex digits or a 32-bit integer"
);

define_id!(
    /// Identifier of an asset package
    PackageId,
    "a package id as eight hex digits or a 32-bit integer"
);
