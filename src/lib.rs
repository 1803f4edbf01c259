//! # Locator
//!
//! Location acquisition for apps running on top of a platform location
//! provider: the last known fix or live updates, with runtime permissions
//! and device location settings negotiated before every request.
//!
//! ## Features
//!
//! - `permission`: permission names, statuses and the host permission trait.
//! - `location`: the location manager, acquisition source and settings resolver.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! locator = { version = "0.1", features = ["location"] }
//! ```
//!
//! ```rust,ignore
//! use locator::location::LocationManager;
//!
//! async fn print_fix(manager: &LocationManager) {
//!     if let Ok(Some(pos)) = manager.get_last_location().await {
//!         println!("Latitude: {}, Longitude: {}", pos.latitude, pos.longitude);
//!     }
//! }
//! ```

#[cfg(feature = "location")]
pub use locator_location as location;

#[cfg(feature = "permission")]
pub use locator_permission as permission;
