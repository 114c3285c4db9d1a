//! Post-processing: scenario headers and seeded field perturbation.

use crate::types::{MockResult, Plan, Scenario};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Number, Value};
use tracing::{debug, warn};

const MILLIS_PER_DAY: u64 = 86_400_000;
/// Numeric timestamps below this are taken to be in seconds.
const SECONDS_CUTOFF: f64 = 1e11;

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponsePostProcessor;

impl ResponsePostProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&self, body: String, plan: &Plan, seed: Option<&str>) -> MockResult {
        let body = match seed {
            Some(seed) => apply_seed(body, seed),
            None => body,
        };

        let content_type = if plan.content_type.to_ascii_lowercase().contains("json") {
            plan.content_type.clone()
        } else {
            "application/json".to_string()
        };
        let mut headers = vec![
            ("Content-Type".to_string(), content_type),
            ("X-Mock-Scenario".to_string(), plan.scenario.as_str().to_string()),
            ("X-Mock-Generated".to_string(), "true".to_string()),
        ];

        match plan.scenario {
            Scenario::RateLimit => {
                let reset = chrono::Utc::now().timestamp() + 60;
                headers.push(("Retry-After".to_string(), "60".to_string()));
                headers.push(("X-RateLimit-Limit".to_string(), "100".to_string()));
                headers.push(("X-RateLimit-Remaining".to_string(), "0".to_string()));
                headers.push(("X-RateLimit-Reset".to_string(), reset.to_string()));
            }
            Scenario::ServerError => {
                headers.push(("X-Trace-Id".to_string(), uuid::Uuid::new_v4().to_string()));
            }
            _ => {}
        }

        MockResult {
            status: plan.status_code,
            body,
            headers,
        }
    }
}

/// Same seed string, same generator state.
pub fn seeded_rng(seed: &str) -> StdRng {
    let hash = blake3::hash(seed.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    StdRng::seed_from_u64(u64::from_le_bytes(bytes))
}

/// Rewrite numeric `*id*` and `*timestamp*` fields deterministically. Bodies
/// that are not JSON pass through untouched.
pub fn apply_seed(body: String, seed: &str) -> String {
    let mut value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Seed not applied to non-JSON body");
            return body;
        }
    };
    let mut rng = seeded_rng(seed);
    perturb(&mut value, &mut rng);
    debug!(seed, "Applied seed perturbation");
    serde_json::to_string(&value).unwrap_or(body)
}

fn perturb(value: &mut Value, rng: &mut StdRng) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let key = key.to_lowercase();
                match child {
                    Value::Number(_) if key.contains("id") => {
                        *child = Value::from(rng.random_range(0..10_000u32));
                    }
                    Value::Number(n) if key.contains("timestamp") => {
                        let shifted = shift_timestamp(n, rng);
                        *child = Value::Number(shifted);
                    }
                    Value::Object(_) | Value::Array(_) => perturb(child, rng),
                    _ => {}
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                perturb(item, rng);
            }
        }
        _ => {}
    }
}

fn shift_timestamp(n: &Number, rng: &mut StdRng) -> Number {
    let offset_ms = rng.random_range(0..MILLIS_PER_DAY);
    let magnitude = n.as_f64().unwrap_or_default().abs();
    let offset = if magnitude < SECONDS_CUTOFF {
        offset_ms / 1000
    } else {
        offset_ms
    };

    if let Some(i) = n.as_i64() {
        Number::from(i.saturating_sub(offset as i64))
    } else if let Some(u) = n.as_u64() {
        Number::from(u.saturating_sub(offset))
    } else {
        let shifted = n.as_f64().unwrap_or_default() - offset as f64;
        Number::from_f64(shifted).unwrap_or_else(|| n.clone())
    }
}
