// SPDX-License-Identifier: GPL-3.0-only

//! Camera permission through xdg-desktop-portal
//!
//! Outside a sandbox camera devices are directly accessible. Inside one the
//! stored decision is read from the permission store and access is requested
//! with `org.freedesktop.portal.Camera.AccessCamera`.

use super::{AuthorizationState, PermissionGate};
use crate::constants::portal::{CAMERA_PERMISSION_ID, FLATPAK_INFO, PERMISSION_TABLE};
use crate::errors::PermissionError;
use std::collections::HashMap;
use std::os::fd::OwnedFd;
use std::path::Path;
use tracing::{debug, info, warn};
use zbus::blocking::{Connection, Proxy};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

const PORTAL_DESTINATION: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const CAMERA_INTERFACE: &str = "org.freedesktop.portal.Camera";
const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";

const STORE_DESTINATION: &str = "org.freedesktop.impl.portal.PermissionStore";
const STORE_PATH: &str = "/org/freedesktop/impl/portal/PermissionStore";

/// Permission gate backed by the desktop portal
#[derive(Debug, Clone)]
pub struct PortalPermission {
    /// Flatpak application id, `None` when not sandboxed
    app_id: Option<String>,
}

impl PortalPermission {
    /// Detect whether we run inside a sandbox
    pub fn new() -> Self {
        let app_id = read_flatpak_app_id(Path::new(FLATPAK_INFO));
        match &app_id {
            Some(id) => info!(app_id = %id, "Running sandboxed, using camera portal"),
            None => debug!("Not sandboxed, camera devices are directly accessible"),
        }
        Self { app_id }
    }

    pub fn is_sandboxed(&self) -> bool {
        self.app_id.is_some()
    }

    fn camera_proxy(connection: &Connection) -> zbus::Result<Proxy<'static>> {
        Proxy::new(connection, PORTAL_DESTINATION, PORTAL_PATH, CAMERA_INTERFACE)
    }

    /// Stored decision for this app: `Some(true)` yes, `Some(false)` no
    fn stored_decision(connection: &Connection, app_id: &str) -> Option<bool> {
        let store = Proxy::new(connection, STORE_DESTINATION, STORE_PATH, STORE_DESTINATION)
            .map_err(|e| debug!(error = %e, "Permission store unavailable"))
            .ok()?;

        let reply: zbus::Result<(HashMap<String, Vec<String>>, OwnedValue)> =
            store.call("Lookup", &(PERMISSION_TABLE, CAMERA_PERMISSION_ID));
        let (permissions, _) = reply
            .map_err(|e| debug!(error = %e, "No stored camera permission"))
            .ok()?;

        let decision = permissions.get(app_id)?.first()?;
        debug!(app_id, decision = %decision, "Stored camera permission");
        Some(decision == "yes")
    }
}

impl Default for PortalPermission {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGate for PortalPermission {
    fn authorization_status(&self) -> AuthorizationState {
        let Some(app_id) = self.app_id.as_deref() else {
            return AuthorizationState::Authorized;
        };

        let connection = match Connection::session() {
            Ok(connection) => connection,
            Err(e) => {
                warn!(error = %e, "Session bus unavailable");
                return AuthorizationState::Restricted;
            }
        };

        let present = Self::camera_proxy(&connection)
            .and_then(|camera| camera.get_property::<bool>("IsCameraPresent"));
        match present {
            Ok(present) => debug!(present, "Camera portal reachable"),
            Err(e) => {
                warn!(error = %e, "Camera portal unavailable");
                return AuthorizationState::Restricted;
            }
        }

        // The store is not always reachable from inside the sandbox; the
        // portal answers from its own record when asked.
        match Self::stored_decision(&connection, app_id) {
            Some(true) => AuthorizationState::Authorized,
            Some(false) => AuthorizationState::Denied,
            None => AuthorizationState::NotDetermined,
        }
    }

    fn request_access(&self) -> Result<bool, PermissionError> {
        if !self.is_sandboxed() {
            return Ok(true);
        }

        let portal_err = |e: zbus::Error| PermissionError::Portal(e.to_string());
        let connection = Connection::session().map_err(portal_err)?;
        let camera = Self::camera_proxy(&connection).map_err(portal_err)?;

        let token = format!("snapcam_{}", std::process::id());
        let sender = connection
            .unique_name()
            .map(|name| name.as_str().trim_start_matches(':').replace('.', "_"))
            .ok_or_else(|| PermissionError::Portal("No unique bus name".to_string()))?;
        let request_path = format!("{}/request/{}/{}", PORTAL_PATH, sender, token);

        // Subscribe before calling so the response cannot be missed
        let request = Proxy::new(
            &connection,
            PORTAL_DESTINATION,
            request_path.as_str(),
            REQUEST_INTERFACE,
        )
        .map_err(portal_err)?;
        let mut responses = request.receive_signal("Response").map_err(portal_err)?;

        let mut options: HashMap<&str, Value> = HashMap::new();
        options.insert("handle_token", Value::from(token.as_str()));
        let handle: OwnedObjectPath = camera
            .call("AccessCamera", &(options,))
            .map_err(portal_err)?;
        debug!(handle = %handle.as_str(), "Camera access requested");

        let message = responses
            .next()
            .ok_or_else(|| PermissionError::Portal("Request closed without response".to_string()))?;
        let (response, _results): (u32, HashMap<String, OwnedValue>) =
            message.body().deserialize().map_err(portal_err)?;

        info!(response, "Camera access answered");
        Ok(response == 0)
    }

    fn open_remote(&self) -> Option<OwnedFd> {
        if !self.is_sandboxed() {
            return None;
        }

        let result = Connection::session()
            .and_then(|connection| {
                let camera = Self::camera_proxy(&connection)?;
                let options: HashMap<&str, Value> = HashMap::new();
                camera.call::<_, _, zbus::zvariant::OwnedFd>("OpenPipeWireRemote", &(options,))
            })
            .map(OwnedFd::from);

        match result {
            Ok(fd) => Some(fd),
            Err(e) => {
                warn!(error = %e, "Failed to open PipeWire remote");
                None
            }
        }
    }
}

/// Read `[Application] name=` from the Flatpak info file
fn read_flatpak_app_id(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    parse_flatpak_app_id(&contents)
}

fn parse_flatpak_app_id(contents: &str) -> Option<String> {
    let mut in_application = false;
    for line in contents.lines().map(str::trim) {
        if line.starts_with('[') {
            in_application = line == "[Application]";
            continue;
        }
        if !in_application {
            continue;
        }
        if let Some(name) = line.strip_prefix("name=") {
            return Some(name.trim().to_string());
        }
    }
    None
}
