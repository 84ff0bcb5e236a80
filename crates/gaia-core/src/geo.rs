//! Great-circle distance and the user-location state machine.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Advisory shown in the text chat when no location could be obtained.
pub const CHAT_LOCATION_ADVISORY: &str =
    "Não foi possível obter a localização. A busca baseada na localização será desativada.";

/// Advisory shown in the voice agent when no location could be obtained.
pub const LIVE_LOCATION_ADVISORY: &str =
    "Não foi possível obter a localização. As sugestões baseadas na localização podem ser limitadas.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl UserLocation {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Haversine distance in kilometres between two decimal-degree points.
///
/// No range validation: NaN inputs propagate as a NaN result.
#[must_use]
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Write a float the way JavaScript's `JSON.stringify` does: whole values
/// without a trailing `.0`, everything else unchanged.
#[allow(
    clippy::trivially_copy_pass_by_ref,
    clippy::float_cmp,
    clippy::cast_possible_truncation
)]
pub(crate) fn serialize_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Why the platform could not supply a location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("location unavailable: {reason}")]
pub struct LocationUnavailable {
    pub reason: String,
}

impl LocationUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Where the session stands on knowing the user's position.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LocationState {
    #[default]
    Unknown,
    Available(UserLocation),
    Unavailable(String),
}

impl LocationState {
    /// The location, if one was obtained. `Unknown` and `Unavailable` both mean none.
    #[must_use]
    pub fn location(&self) -> Option<UserLocation> {
        match self {
            LocationState::Available(loc) => Some(*loc),
            LocationState::Unknown | LocationState::Unavailable(_) => None,
        }
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LocationState::Unavailable(_))
    }
}

/// Platform geolocation capability, asked once per UI session.
pub trait LocationProvider {
    fn current_location(
        &self,
    ) -> impl Future<Output = Result<UserLocation, LocationUnavailable>> + Send;
}

/// Ask the provider for a position and fold the answer into a [`LocationState`].
///
/// Denial is never an error here; it becomes `Unavailable` with the reason.
pub async fn resolve_location<P>(provider: &P) -> LocationState
where
    P: LocationProvider + Sync,
{
    match provider.current_location().await {
        Ok(loc) => LocationState::Available(loc),
        Err(err) => LocationState::Unavailable(err.reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAO_PAULO: (f64, f64) = (-23.56135, -46.65655);
    const RIO: (f64, f64) = (-22.9035, -43.1795);

    #[test]
    fn distance_to_self_is_zero() {
        let d = distance_km(SAO_PAULO.0, SAO_PAULO.1, SAO_PAULO.0, SAO_PAULO.1);
        assert!(d.abs() < 1e-9, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = distance_km(SAO_PAULO.0, SAO_PAULO.1, RIO.0, RIO.1);
        let ba = distance_km(RIO.0, RIO.1, SAO_PAULO.0, SAO_PAULO.1);
        assert!((ab - ba).abs() < 1e-9, "{ab} != {ba}");
    }

    #[test]
    fn sao_paulo_to_rio_is_about_360_km() {
        let d = distance_km(SAO_PAULO.0, SAO_PAULO.1, RIO.0, RIO.1);
        assert!((350.0..370.0).contains(&d), "got {d}");
    }

    #[test]
    fn quarter_meridian_matches_earth_radius() {
        let d = distance_km(0.0, 0.0, 90.0, 0.0);
        let expected = EARTH_RADIUS_KM * std::f64::consts::FRAC_PI_2;
        assert!((d - expected).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn nan_input_propagates() {
        assert!(distance_km(f64::NAN, 0.0, 0.0, 0.0).is_nan());
    }

    struct Fixed(Result<UserLocation, LocationUnavailable>);

    impl LocationProvider for Fixed {
        async fn current_location(&self) -> Result<UserLocation, LocationUnavailable> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn resolve_location_available() {
        let provider = Fixed(Ok(UserLocation::new(1.0, 2.0)));
        let state = resolve_location(&provider).await;
        assert_eq!(state.location(), Some(UserLocation::new(1.0, 2.0)));
        assert!(!state.is_unavailable());
    }

    #[tokio::test]
    async fn resolve_location_denied_is_unavailable() {
        let provider = Fixed(Err(LocationUnavailable::new("permission denied")));
        let state = resolve_location(&provider).await;
        assert_eq!(
            state,
            LocationState::Unavailable("permission denied".to_string())
        );
        assert!(state.location().is_none());
    }

    #[test]
    fn unknown_state_has_no_location() {
        assert!(LocationState::default().location().is_none());
    }
}
