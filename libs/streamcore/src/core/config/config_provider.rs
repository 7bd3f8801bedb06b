// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use parking_lot::RwLock;

use super::SourceParam;

/// Supplies the owning module's identity and current source configuration.
///
/// Read once per `open`, so a provider may change its answer between runs.
pub trait ConfigProvider: Send + Sync {
    fn module_name(&self) -> &str;
    fn source_param(&self) -> SourceParam;
}

/// Provider backed by an in-memory [`SourceParam`] that can be replaced.
#[derive(Debug)]
pub struct StaticConfigProvider {
    module_name: String,
    param: RwLock<SourceParam>,
}

impl StaticConfigProvider {
    pub fn new(module_name: impl Into<String>, param: SourceParam) -> Self {
        Self {
            module_name: module_name.into(),
            param: RwLock::new(param),
        }
    }

    /// Takes effect on the next `open`.
    pub fn set_source_param(&self, param: SourceParam) {
        *self.param.write() = param;
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn module_name(&self) -> &str {
        &self.module_name
    }

    fn source_param(&self) -> SourceParam {
        self.param.read().clone()
    }
}
