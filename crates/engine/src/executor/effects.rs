//! Effect bridge between workflow intent and host-application state.
//!
//! The engine never performs domain logic for an `effect` task. It collects the
//! task's parameters, interpolates them, and hands them to an
//! [`EffectDispatcher`] together with write access to the variable store.

use indexmap::IndexMap;
use thiserror::Error;
use tracing::info;

use crate::store::VariableStore;

/// Named, pre-interpolated effect parameters in a stable order.
pub type EffectParameters = IndexMap<String, String>;

/// Errors a dispatcher may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    #[error("unknown effect '{effect}'")]
    UnknownEffect { effect: String },

    #[error("effect '{effect}' rejected its parameters: {reason}")]
    InvalidParameters { effect: String, reason: String },

    #[error("effect '{effect}' failed: {reason}")]
    Failed { effect: String, reason: String },
}

/// Host-side executor of named side effects.
pub trait EffectDispatcher {
    /// Perform `effect` with `parameters`, reading and writing `store` as needed.
    fn dispatch(&mut self, effect: &str, parameters: &EffectParameters, store: &mut VariableStore) -> Result<(), EffectError>;
}

impl<F> EffectDispatcher for F
where
    F: FnMut(&str, &EffectParameters, &mut VariableStore) -> Result<(), EffectError>,
{
    fn dispatch(&mut self, effect: &str, parameters: &EffectParameters, store: &mut VariableStore) -> Result<(), EffectError> {
        self(effect, parameters, store)
    }
}

/// Dispatcher that recognizes no effects. Suitable for workflows without `effect` tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEffects;

impl EffectDispatcher for NoEffects {
    fn dispatch(&mut self, effect: &str, _parameters: &EffectParameters, _store: &mut VariableStore) -> Result<(), EffectError> {
        Err(EffectError::UnknownEffect {
            effect: effect.to_string(),
        })
    }
}

/// Store key updated by `addGold`.
pub const GOLD_KEY: &str = "gold";
/// Store key updated by `grantTitle`.
pub const PLAYER_TITLE_KEY: &str = "player_title";

/// Reference game effects: `addGold`, `setFlag`, and `grantTitle`.
///
/// Stands in for a real host integration; swap it for an adapter that calls
/// into the application's own services.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoGameEffects;

impl EffectDispatcher for DemoGameEffects {
    fn dispatch(&mut self, effect: &str, parameters: &EffectParameters, store: &mut VariableStore) -> Result<(), EffectError> {
        match effect {
            "addGold" => {
                let delta = parse_or_zero(parameters.get("amount").map(String::as_str));
                let current = parse_or_zero(store.get(GOLD_KEY));
                let total = current.saturating_add(delta);
                store.set(GOLD_KEY, total.to_string());
                info!(effect, delta, total, "gold added");
                Ok(())
            }
            "setFlag" => {
                let key = parameters
                    .get("key")
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| EffectError::InvalidParameters {
                        effect: effect.to_string(),
                        reason: "setFlag requires 'key'".to_string(),
                    })?;
                let value = parameters.get("value").cloned().unwrap_or_default();
                info!(effect, key = %key, value = %value, "flag set");
                store.set(key.clone(), value);
                Ok(())
            }
            "grantTitle" => {
                let title = parameters.get("value").cloned().unwrap_or_default();
                info!(effect, title = %title, "title granted");
                store.set(PLAYER_TITLE_KEY, title);
                Ok(())
            }
            other => Err(EffectError::UnknownEffect {
                effect: other.to_string(),
            }),
        }
    }
}

fn parse_or_zero(raw: Option<&str>) -> i64 {
    raw.and_then(|text| text.trim().parse::<i64>().ok()).unwrap_or(0)
}
