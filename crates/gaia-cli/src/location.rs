//! Where the CLI gets the user's position from: flags or environment.

use clap::Args;
use gaia_core::{LocationProvider, LocationUnavailable, UserLocation};

/// Optional user position. Both coordinates are needed for location-aware
/// answers; without them the assistant falls back to web search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Args)]
pub struct LocationArgs {
    /// Latitude in decimal degrees
    #[arg(long = "lat", env = "GAIA_LATITUDE", allow_negative_numbers = true)]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    #[arg(long = "lon", env = "GAIA_LONGITUDE", allow_negative_numbers = true)]
    pub longitude: Option<f64>,
}

impl LocationProvider for LocationArgs {
    async fn current_location(&self) -> Result<UserLocation, LocationUnavailable> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    return Err(LocationUnavailable::new(format!(
                        "coordinates out of range: {lat}, {lon}"
                    )));
                }
                Ok(UserLocation::new(lat, lon))
            }
            (None, None) => Err(LocationUnavailable::new("no location provided")),
            _ => Err(LocationUnavailable::new(
                "both --lat and --lon are required",
            )),
        }
    }
}
