//! Registration source for devices and credentials.
//!
//! Ids are unique per registry; a duplicate is rejected at registration so
//! evaluation can assume every id resolves to exactly one record.

use std::collections::HashMap;
use std::sync::Arc;

use tagward_core::{Credential, CredentialId, DeviceId, ReaderDevice};

use crate::config::RootConfig;
use crate::error::{RootError, RootResult};

#[derive(Default)]
pub struct Registry {
    devices: HashMap<DeviceId, Arc<ReaderDevice>>,
    credentials: HashMap<CredentialId, Credential>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register every device and credential in `config`.
    pub fn from_config(config: &RootConfig) -> RootResult<Self> {
        let mut registry = Self::new();
        for device in &config.devices {
            registry.register_device(device.build()?)?;
        }
        for credential in &config.credentials {
            registry.register_credential(credential.build()?)?;
        }
        Ok(registry)
    }

    pub fn register_device(&mut self, device: ReaderDevice) -> RootResult<Arc<ReaderDevice>> {
        if self.devices.contains_key(device.id()) {
            return Err(RootError::Config(format!(
                "duplicate device id '{}'",
                device.id()
            )));
        }
        let device = Arc::new(device);
        self.devices.insert(device.id().clone(), Arc::clone(&device));
        Ok(device)
    }

    pub fn register_credential(&mut self, credential: Credential) -> RootResult<()> {
        if self.credentials.contains_key(credential.id()) {
            return Err(RootError::Config(format!(
                "duplicate credential id '{}'",
                credential.id()
            )));
        }
        self.credentials.insert(credential.id().clone(), credential);
        Ok(())
    }

    pub fn device(&self, id: &DeviceId) -> RootResult<&Arc<ReaderDevice>> {
        self.devices
            .get(id)
            .ok_or_else(|| RootError::UnknownDevice(id.to_string()))
    }

    pub fn credential(&self, id: &CredentialId) -> RootResult<&Credential> {
        self.credentials
            .get(id)
            .ok_or_else(|| RootError::UnknownCredential(id.to_string()))
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }
}
