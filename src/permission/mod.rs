// SPDX-License-Identifier: MPL-2.0

//! Camera permission gate
//!
//! The state is read once per launch. `NotDetermined` leads to exactly one
//! request; a refusal is final for the rest of the process.

pub mod portal;

pub use portal::PortalPermission;

use crate::errors::PermissionError;
use std::os::fd::OwnedFd;

/// Camera authorization as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
    Authorized,
    Denied,
    /// The user has not been asked yet
    NotDetermined,
    /// Access is blocked and cannot be requested
    Restricted,
}

impl std::fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorizationState::Authorized => write!(f, "authorized"),
            AuthorizationState::Denied => write!(f, "denied"),
            AuthorizationState::NotDetermined => write!(f, "not determined"),
            AuthorizationState::Restricted => write!(f, "restricted"),
        }
    }
}

/// Source of camera authorization
///
/// Every method may block on IPC; callers run them on the worker context.
pub trait PermissionGate: Send + Sync {
    /// Current authorization, without prompting
    fn authorization_status(&self) -> AuthorizationState;

    /// Prompt the user; `Ok(true)` when access was granted
    fn request_access(&self) -> Result<bool, PermissionError>;

    /// PipeWire remote granting access to camera nodes, when sandboxed
    fn open_remote(&self) -> Option<OwnedFd> {
        None
    }
}
