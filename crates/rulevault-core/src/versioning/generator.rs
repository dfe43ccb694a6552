//! Built-in version number generators.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{ErrorCode, RepositoryError, RepositoryResult};
use crate::item::VersionedNode;
use crate::traits::VersionNumberGenerator;

/// Plain integer markers: `1`, `2`, `3`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementingVersionGenerator;

impl VersionNumberGenerator for IncrementingVersionGenerator {
    fn calculate_next_version(
        &self,
        current: Option<&str>,
        _item: &VersionedNode,
    ) -> RepositoryResult<String> {
        let Some(current) = current else {
            return Ok("1".to_string());
        };
        let n = parse_component(current, current)?;
        Ok(bump(n, current)?.to_string())
    }
}

/// Major.minor markers where every check-in bumps the minor part.
///
/// `None` becomes `1.0`, `2.3` becomes `2.4`, and a bare `3` becomes `3.1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DottedVersionGenerator;

impl VersionNumberGenerator for DottedVersionGenerator {
    fn calculate_next_version(
        &self,
        current: Option<&str>,
        _item: &VersionedNode,
    ) -> RepositoryResult<String> {
        let Some(current) = current else {
            return Ok("1.0".to_string());
        };
        match current.split_once('.') {
            Some((major, minor)) => {
                let major = parse_component(major, current)?;
                let minor = parse_component(minor, current)?;
                Ok(format!("{major}.{}", bump(minor, current)?))
            }
            None => {
                let major = parse_component(current, current)?;
                Ok(format!("{major}.1"))
            }
        }
    }
}

fn parse_component(part: &str, marker: &str) -> RepositoryResult<u64> {
    part.trim().parse::<u64>().map_err(|_| {
        RepositoryError::validation_with_suggestion(
            format!("Cannot derive a version number from '{marker}'"),
            ErrorCode::ValInvalidVersionNumber,
            "Use a custom VersionNumberGenerator for non-numeric markers",
        )
    })
}

fn bump(n: u64, marker: &str) -> RepositoryResult<u64> {
    n.checked_add(1).ok_or_else(|| {
        RepositoryError::validation_with_suggestion(
            format!("Version number '{marker}' cannot be incremented"),
            ErrorCode::ValInvalidVersionNumber,
            "Start a new major version or use a custom VersionNumberGenerator",
        )
    })
}

/// Configurable choice of built-in generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VersionScheme {
    #[default]
    Incrementing,
    Dotted,
}

impl VersionScheme {
    pub fn generator(&self) -> Arc<dyn VersionNumberGenerator> {
        match self {
            VersionScheme::Incrementing => Arc::new(IncrementingVersionGenerator),
            VersionScheme::Dotted => Arc::new(DottedVersionGenerator),
        }
    }
}
