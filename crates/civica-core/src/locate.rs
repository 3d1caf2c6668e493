use crate::error::LocateError;
use crate::types::GeoLocation;
use std::thread;
use std::time::Duration;

/// Sentinel coordinates used when the device position is unknown.
pub const FALLBACK_LATITUDE: f64 = 19.076;
pub const FALLBACK_LONGITUDE: f64 = 72.877;

/// Placeholder addresses for the two degraded paths.
pub const ADDRESS_UNAVAILABLE: &str = "Location Unavailable";
pub const ADDRESS_UNSUPPORTED: &str = "Location Not Supported";

/// Address returned by the simulated reverse geocoder.
const RESOLVED_ADDRESS: &str = "24-B Green View Colony, Ward 12";

/// Trait for device-position backends. Implementations resolve within the
/// given timeout or return `LocateError::Timeout`.
pub trait GeoBackend: Send {
    fn position(&mut self, timeout: Duration) -> Result<(f64, f64), LocateError>;
}

/// Produces a best-effort address for the device position at capture time.
/// `resolve` never fails: location trouble degrades to sentinel coordinates
/// with a placeholder address, because a missing location must never block
/// issue creation.
pub struct LocationResolver {
    backend: Box<dyn GeoBackend>,
    timeout: Duration,
    geocode_delay: Duration,
}

impl LocationResolver {
    pub fn new(backend: Box<dyn GeoBackend>, timeout: Duration, geocode_delay: Duration) -> Self {
        Self {
            backend,
            timeout,
            geocode_delay,
        }
    }

    pub fn resolve(&mut self) -> GeoLocation {
        match self.backend.position(self.timeout) {
            Ok((latitude, longitude)) => {
                // Coordinates are known immediately; the human-readable
                // address arrives after the (simulated) reverse geocode.
                thread::sleep(self.geocode_delay);
                GeoLocation {
                    latitude,
                    longitude,
                    address: reverse_geocode(latitude, longitude),
                }
            }
            Err(LocateError::Unsupported) => sentinel(ADDRESS_UNSUPPORTED),
            Err(err) => {
                eprintln!("geolocation failed: {err}");
                sentinel(ADDRESS_UNAVAILABLE)
            }
        }
    }
}

fn sentinel(address: &str) -> GeoLocation {
    GeoLocation {
        latitude: FALLBACK_LATITUDE,
        longitude: FALLBACK_LONGITUDE,
        address: address.to_string(),
    }
}

/// Simulated reverse geocode. A real geocoding service plugs in here; the
/// demo returns the fixed ward address regardless of position.
fn reverse_geocode(_latitude: f64, _longitude: f64) -> String {
    RESOLVED_ADDRESS.to_string()
}

/// Backend reporting a fixed position, configured per device.
pub struct FixedPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoBackend for FixedPosition {
    fn position(&mut self, _timeout: Duration) -> Result<(f64, f64), LocateError> {
        Ok((self.latitude, self.longitude))
    }
}

/// Backend for devices without geolocation capability.
pub struct NoGeolocation;

impl GeoBackend for NoGeolocation {
    fn position(&mut self, _timeout: Duration) -> Result<(f64, f64), LocateError> {
        Err(LocateError::Unsupported)
    }
}
