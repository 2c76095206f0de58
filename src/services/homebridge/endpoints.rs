// Homebridge accessory operations.
// Light listing for the refresh loop, plus single-light toggles and batch scene switching.

use tracing::warn;

use crate::error::{HubError, Result};

use super::client::HomebridgeClient;
use super::types::{
    Accessory, BatchFailure, BatchResult, Light, SetCharacteristic, ToggleResult,
};

impl HomebridgeClient {
    /// Get every accessory service.
    pub async fn get_accessories(&self) -> Result<Vec<Accessory>> {
        self.get_json("/api/accessories").await
    }

    /// Get the light-like accessories in simplified form.
    pub async fn fetch_lights(&self) -> Result<Vec<Light>> {
        let accessories = self.get_accessories().await?;
        Ok(accessories
            .iter()
            .filter(|accessory| accessory.is_light())
            .map(Light::from)
            .collect())
    }

    /// Switch one accessory on or off.
    pub async fn set_on(&self, unique_id: &str, on: bool) -> Result<()> {
        self.put_json(
            &format!("/api/accessories/{unique_id}"),
            &SetCharacteristic::on(on),
        )
        .await?;
        Ok(())
    }

    /// Flip one light and report its new state.
    pub async fn toggle_light(&self, unique_id: &str) -> Result<ToggleResult> {
        let accessories = self.get_accessories().await?;
        let target = accessories
            .iter()
            .find(|accessory| accessory.unique_id.as_deref() == Some(unique_id))
            .ok_or_else(|| HubError::NotFound(format!("Accessory {unique_id}")))?;

        let on = !target.is_on();
        self.set_on(unique_id, on).await?;

        Ok(ToggleResult {
            unique_id: unique_id.to_string(),
            name: target
                .service_name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            on,
        })
    }

    /// Switch a batch of lights one by one, collecting per-light failures.
    pub async fn set_lights(&self, unique_ids: &[String], on: bool) -> BatchResult {
        let mut result = BatchResult::default();
        for unique_id in unique_ids {
            match self.set_on(unique_id, on).await {
                Ok(()) => result.affected += 1,
                Err(e) => {
                    warn!(unique_id = %unique_id, on, error = %e, "failed to switch light");
                    result.errors.push(BatchFailure {
                        unique_id: unique_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        result
    }
}
