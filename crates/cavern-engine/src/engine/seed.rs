use std::{fmt, str::FromStr};

use rand::{
    Rng,
    distr::{Distribution, StandardUniform},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Seed for deterministic cavern generation.
///
/// A 128-bit seed for the generator's random walk. The same seed always carves
/// the same cavern, which makes headless flights and tests reproducible.
///
/// Displayed, parsed and serialized as a 32-digit hexadecimal string.
///
/// # Example
///
/// ```
/// use cavern_engine::{CavernGenerator, CavernSeed};
///
/// let seed = CavernSeed::from_u128(7);
/// let mut a = CavernGenerator::with_seed(seed);
/// let mut b = CavernGenerator::with_seed(seed);
/// for _ in 0..50 {
///     a.advance();
///     b.advance();
/// }
/// assert_eq!(a.grid(), b.grid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CavernSeed([u8; 16]);

impl CavernSeed {
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }
}

/// Text that is not a 32-digit hexadecimal cavern seed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid hex seed {text:?}: expected 32 hexadecimal digits")]
pub struct ParseSeedError {
    text: String,
}

impl fmt::Display for CavernSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

impl FromStr for CavernSeed {
    type Err = ParseSeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ParseSeedError { text: s.to_owned() };
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(error());
        }
        u128::from_str_radix(s, 16)
            .map(Self::from_u128)
            .map_err(|_| error())
    }
}

impl Serialize for CavernSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CavernSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl Distribution<CavernSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> CavernSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        CavernSeed(seed)
    }
}
