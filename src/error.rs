// SPDX-FileCopyrightText: 2026 The vrt-bridge Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Error types for the `vrt-bridge` crate.
*/

use thiserror::Error;

/// Generic `vrt-bridge` crate error enumeration.
#[derive(Error, Debug)]
pub enum VrtError {
    /// A malformed wire packet, a null/missing precondition, or an
    /// unparseable mapping-file line.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Allocation failure in a registry operation.
    #[error("out of memory")]
    OutOfMemory,
    /// The caller-supplied serialization buffer was too small.
    #[error("buffer too small")]
    NoBuffer,
    /// A socket/bind/receive failure.
    #[error("network failure: {0}")]
    NetworkFailure(#[from] std::io::Error),
    /// A soft failure: a host device/channel/attribute lookup miss.
    /// Translation continues with the next mapping.
    #[error("not found: {0}")]
    NotFound(String),
}
