// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");

    // Packaged builds (flatpak, distro) pass the version in explicitly
    let version = if let Ok(v) = std::env::var("SNAPCAM_VERSION") {
        v
    } else {
        git_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Version string derived from `git describe`
///
/// - "0.1.0" at a tag becomes "0.1.0-abcdef1"
/// - "0.1.0-5-gabcdef1" becomes "0.1.0-dirty-abcdef1"
/// - no tags at all falls back to the bare commit hash
fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--match", "v*"])
        .output()
        .ok()?;

    if !output.status.success() {
        return commit_hash();
    }

    let described = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let described = described.strip_prefix('v').unwrap_or(&described);

    if described.contains('-') {
        let parts: Vec<&str> = described.rsplitn(3, '-').collect();
        if parts.len() >= 3 {
            let hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
            return Some(format!("{}-dirty-{}", parts[2], hash));
        }
        return Some(described.to_string());
    }

    let hash = commit_hash().unwrap_or_else(|| "unknown".to_string());
    if described == hash {
        Some(hash)
    } else {
        Some(format!("{}-{}", described, hash))
    }
}

fn commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}
