// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod config_provider;
mod source_param;

pub use config_provider::{ConfigProvider, StaticConfigProvider};
pub use source_param::SourceParam;
