// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::mesh::TraversalError;

/// Every fallible model operation returns one of these. Success is `Ok`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeshError {
    /// Malformed or out-of-range input, or mismatched array lengths.
    InvalidParameter(String),
    /// The operation is not applicable to the current topology, or there is
    /// no mesh to operate on.
    Failure(String),
}

pub type MeshResult<T> = Result<T, MeshError>;

impl MeshError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        MeshError::InvalidParameter(msg.into())
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        MeshError::Failure(msg.into())
    }

    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, MeshError::InvalidParameter(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, MeshError::Failure(_))
    }
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::InvalidParameter(msg) => write!(f, "Invalid parameter: {msg}"),
            MeshError::Failure(msg) => write!(f, "Failure: {msg}"),
        }
    }
}
impl std::error::Error for MeshError {}

impl From<TraversalError> for MeshError {
    fn from(err: TraversalError) -> Self {
        MeshError::Failure(format!("Malformed mesh connectivity: {err}"))
    }
}

/// Returns early with an `InvalidParameter` error.
macro_rules! bail_invalid {
    ($($arg:tt)*) => {
        return Err($crate::error::MeshError::InvalidParameter(format!($($arg)*)))
    };
}

/// Returns early with a `Failure` error.
macro_rules! bail_failure {
    ($($arg:tt)*) => {
        return Err($crate::error::MeshError::Failure(format!($($arg)*)))
    };
}

pub(crate) use bail_failure;
pub(crate) use bail_invalid;
