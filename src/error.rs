// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types

use std::fmt;

/// Asset pipeline error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// Descriptor has no `path` field
    MissingPath,

    /// Descriptor is not a JSON object or a field has the wrong shape
    InvalidDescriptor(String),

    /// IO error (file reads, etc.)
    Io(String),

    /// Fetched bytes could not be decoded
    Parse(String),

    /// Loader hook failed for any other reason
    LoadFailed(String),

    /// `create_instance` hook failed
    InstanceFailed(String),

    /// In-flight operation was cancelled
    Cancelled,

    /// Configuration could not be read
    ConfigError(String),
}

impl AssetError {
    /// True when the error was produced by cancelling the operation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AssetError::Cancelled)
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::MissingPath => write!(f, "Descriptor has no path"),
            AssetError::InvalidDescriptor(msg) => write!(f, "Invalid descriptor: {msg}"),
            AssetError::Io(msg) => write!(f, "IO error: {msg}"),
            AssetError::Parse(msg) => write!(f, "Parse error: {msg}"),
            AssetError::LoadFailed(msg) => write!(f, "Asset load error: {msg}"),
            AssetError::InstanceFailed(msg) => write!(f, "Instance creation error: {msg}"),
            AssetError::Cancelled => write!(f, "Operation cancelled"),
            AssetError::ConfigError(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for AssetError {}

impl From<std::io::Error> for AssetError {
    fn from(err: std::io::Error) -> Self {
        AssetError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AssetError {
    fn from(err: serde_json::Error) -> Self {
        AssetError::Parse(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AssetError>;
