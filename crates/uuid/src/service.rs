//! Internal implementation of identifier services.

use crate::{IdError, IdResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::{fmt, str::FromStr};

use ::uuid::Uuid;

/// Maximum length of a FHIR logical id.
const MAX_ID_LEN: usize = 64;

/// A validated FHIR logical id.
///
/// Once you have a `ResourceId`, you can safely embed it in a `Type/id` reference without
/// escaping.
///
/// # Construction
/// - [`ResourceId::random`] generates a new hyphenated v4 UUID.
/// - [`ResourceId::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(String);

impl ResourceId {
    /// Generates a fresh random id (hyphenated v4 UUID).
    pub fn random() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    /// Validates and wraps an id string.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` is not a valid logical id.
    pub fn parse(input: &str) -> IdResult<Self> {
        if Self::is_valid(input) {
            return Ok(Self(input.to_owned()));
        }
        Err(IdError::InvalidInput(format!(
            "resource id must be 1-64 characters of [A-Za-z0-9-.], got: '{}'",
            input
        )))
    }

    /// Returns true if `input` is a syntactically valid logical id.
    pub fn is_valid(input: &str) -> bool {
        !input.is_empty()
            && input.len() <= MAX_ID_LEN
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'.'))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::parse(s)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResourceId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Source of fresh resource ids.
///
/// Implementations must be safe to share between threads, since one generator is used by every
/// assembly call of a service.
pub trait IdGenerator: Send + Sync {
    /// Returns a new id, distinct from every id previously returned by this generator.
    fn next_id(&self) -> ResourceId;
}

/// Production generator backed by random v4 UUIDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> ResourceId {
        ResourceId::random()
    }
}

/// Deterministic generator producing `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    /// Creates a generator with the given prefix.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if the prefix would not produce valid ids.
    pub fn new(prefix: &str) -> IdResult<Self> {
        // Leave room for "-" and a u64 counter.
        if !ResourceId::is_valid(prefix) || prefix.len() > MAX_ID_LEN - 21 {
            return Err(IdError::InvalidInput(format!(
                "invalid id prefix: '{}'",
                prefix
            )));
        }
        Ok(Self {
            prefix: prefix.to_owned(),
            counter: AtomicU64::new(0),
        })
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> ResourceId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        ResourceId(format!("{}-{}", self.prefix, n))
    }
}
