use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Best-effort position attached to an incident. Absence is valid and must
/// be tolerated downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub formatted: String,
}

/// Single-shot position query seam
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    /// Resolve the current position. Callers bound the wait themselves;
    /// providers should not block indefinitely on their own.
    async fn current_position(&self, high_accuracy: bool) -> Result<Location>;
}

/// Provider backed by a configured fixed position (stationary installs,
/// simulation runs)
pub struct FixedLocationProvider {
    location: Location,
}

impl FixedLocationProvider {
    pub fn new(location: Location) -> Self {
        Self { location }
    }
}

#[async_trait::async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn current_position(&self, _high_accuracy: bool) -> Result<Location> {
        Ok(self.location.clone())
    }
}

/// Provider for installs without any position source; every query fails and
/// incidents are submitted with a null location.
pub struct UnavailableLocationProvider;

#[async_trait::async_trait]
impl LocationProvider for UnavailableLocationProvider {
    async fn current_position(&self, _high_accuracy: bool) -> Result<Location> {
        Err(Error::Location("no position source configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_provider_returns_configured_position() {
        let provider = FixedLocationProvider::new(Location {
            lat: 52.52,
            lng: 13.405,
            formatted: "Berlin".to_string(),
        });

        let loc = provider.current_position(true).await.unwrap();
        assert_eq!(loc.formatted, "Berlin");
    }

    #[tokio::test]
    async fn unavailable_provider_always_errors() {
        let err = UnavailableLocationProvider
            .current_position(true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Location(_)));
    }
}
