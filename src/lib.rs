//! BetterHub - settings sync and entity aliasing for GitHub pages
//!
//! The browser-facing parts of BetterHub (options UI, per-page DOM
//! controllers) sit on top of the pieces in this crate:
//!
//! - [`store`]: key-value storage areas with change notification
//! - [`settings`]: the synchronized settings document, partial updates and
//!   the per-context [`settings::SettingsManager`]
//! - [`registry`]: the built-in features, their settings schemas and page
//!   gating
//! - [`dom`] and [`aliasing`]: entity harvesting from pages and rendering of
//!   user-defined aliases back onto them
//! - [`broadcast`] and [`server`]: delivering settings to pages and to local
//!   clients

pub mod aliasing;
pub mod broadcast;
pub mod config;
pub mod dom;
pub mod registry;
pub mod server;
pub mod settings;
pub mod store;
