// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Feedvault runtime library: Chromium capability, SQLite store, HTTP API.
//!
//! This library crate exposes the runtime modules for integration testing.

#![allow(clippy::new_without_default)]

pub mod cli;
pub mod config;
pub mod download;
pub mod job;
pub mod posts;
pub mod proxy;
pub mod renderer;
pub mod rest;
pub mod storage;
