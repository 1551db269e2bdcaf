//! Integration tests for `Zashterminal` core library
//!
//! These tests run whole workflows against a temporary configuration
//! directory: session management, layouts and restore, highlight rule
//! overrides, settings and backups.

// Allow common test patterns that Clippy warns about
#![allow(clippy::redundant_clone)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]

mod integration;
