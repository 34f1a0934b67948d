use std::fmt::Write as _;

use rand::{
    Rng,
    distr::{Distribution, StandardUniform},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Seed for deterministic world generation.
///
/// A 128-bit (16-byte) seed for the world's random number generator. Two
/// worlds built from the same seed and configuration place traps and safe
/// zones identically, which makes training runs reproducible regardless of
/// how they are scheduled across threads.
///
/// Serialized as a 32 character lower-case hex string.
///
/// # Example
///
/// ```
/// use rand::Rng as _;
/// use safezone_engine::{Environment as _, GridConfig, GridWorld, WorldSeed};
///
/// let seed: WorldSeed = rand::rng().random();
/// let mut a = GridWorld::new(GridConfig::default(), seed).unwrap();
/// let mut b = GridWorld::new(GridConfig::default(), seed).unwrap();
/// assert_eq!(a.reset(), b.reset());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSeed(pub(crate) [u8; 16]);

impl WorldSeed {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl Serialize for WorldSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let num = u128::from_be_bytes(self.0);
        let mut hex_str = String::with_capacity(2 * self.0.len());
        write!(&mut hex_str, "{num:032x}").map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&hex_str)
    }
}

impl<'de> Deserialize<'de> for WorldSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        if hex_str.len() != 32 {
            return Err(serde::de::Error::custom(format!(
                "invalid hex: expected 32 characters, got {}",
                hex_str.len()
            )));
        }
        let num = u128::from_str_radix(&hex_str, 16)
            .map_err(|e| serde::de::Error::custom(format!("invalid hex: {hex_str} ({e})")))?;
        Ok(Self(num.to_be_bytes()))
    }
}

impl Distribution<WorldSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> WorldSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        WorldSeed(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_value_serialization() {
        let mut bytes = [0u8; 16];
        bytes[15] = 0xab;
        let seed = WorldSeed::from_bytes(bytes);
        let json = serde_json::to_string(&seed).unwrap();
        assert_eq!(json, "\"000000000000000000000000000000ab\"");
        let back: WorldSeed = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seed);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let result = serde_json::from_str::<WorldSeed>("\"abc\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_non_hex() {
        let result = serde_json::from_str::<WorldSeed>("\"zz000000000000000000000000000000\"");
        assert!(result.is_err());
    }
}
