// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for captured media
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌────────────────┐
//! │ Camera Frame │ ──▶ │  Photo Output     │ ──▶ │ CapturedImage  │
//! │   (RGBA)     │     │  - RGBA→RGB       │     │ (JPEG / PNG)   │
//! │              │     │  - Encoding       │     │                │
//! └──────────────┘     └───────────────────┘     └────────────────┘
//! ```
//!
//! - [`photo`]: still photo encoding

pub mod photo;
