//! Liveness probe.

use facilitator_core::FacilitatorEngine;
use facilitator_types::HealthResponse;

pub fn health(engine: &FacilitatorEngine) -> HealthResponse {
	HealthResponse {
		status: "ok".to_string(),
		service: engine.config().facilitator.id.clone(),
		timestamp: chrono::Utc::now().to_rfc3339(),
	}
}
