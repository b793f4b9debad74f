use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{HarnessError, HarnessResult};
use crate::extract::EmulatorAddresses;

/// Emulator whose address becomes `auth_host`.
pub const AUTH_EMULATOR: &str = "Authentication";

/// JSON config the application under test reads from its `.env` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeConfig {
    pub auth_host: String,
}

impl RuntimeConfig {
    /// Build the config from discovered emulator addresses.
    pub fn from_addresses(addresses: &EmulatorAddresses) -> HarnessResult<Self> {
        let auth = addresses
            .get(AUTH_EMULATOR)
            .ok_or_else(|| HarnessError::MissingAddress(AUTH_EMULATOR.to_string()))?;
        Ok(Self {
            auth_host: format!("http://{auth}/"),
        })
    }

    pub fn to_json(&self) -> HarnessResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the config to `path`, replacing whatever was there.
    pub fn write_to(&self, path: impl AsRef<Path>) -> HarnessResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
