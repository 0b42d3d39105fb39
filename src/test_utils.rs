//! Common fixtures for unit tests

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rand::{rngs::StdRng, SeedableRng};

use crate::engine::GameRegistry;
use crate::profile::{PlayerKeyMaterial, PrivatePlayerProfile, PublicPlayerProfile};

const FIXTURE_SEED: u64 = 0x7ab1_e5ee;

/// Helpers shared across test modules.
pub mod serde {
    use std::fmt::Debug;

    /// Assert that a value survives a serde_json round-trip using structural equality.
    pub fn assert_round_trip_eq<T>(value: &T)
    where
        T: ::serde::Serialize + ::serde::de::DeserializeOwned + PartialEq + Debug,
    {
        let json = serde_json::to_string(value)
            .expect("serialization should succeed during round-trip testing");
        let restored: T = serde_json::from_str(&json)
            .expect("deserialization should succeed during round-trip testing");
        assert_eq!(restored, *value, "serde_json round-trip altered the value");
    }
}

pub fn fixture_rng() -> StdRng {
    StdRng::seed_from_u64(FIXTURE_SEED)
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 4, 12, 0, 0)
        .single()
        .expect("fixed timestamp is unambiguous")
}

pub fn private_profile(handle: &str) -> PrivatePlayerProfile {
    let mut rng = fixture_rng();
    PrivatePlayerProfile::new(handle, PlayerKeyMaterial::ephemeral(&mut rng), fixed_now())
}

pub fn public_profile(handle: &str) -> PublicPlayerProfile {
    private_profile(handle).to_public()
}

pub fn registry() -> Arc<GameRegistry> {
    Arc::new(GameRegistry::with_builtin_games())
}
