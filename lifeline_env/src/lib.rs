//! Lifeline Environment Abstraction Layer
//!
//! This crate provides the boundary between the tracking core and the
//! outside world: the device location sensor and the map renderer. The core
//! only ever talks to the traits defined here, so the same tracking code
//! runs against **Production** (a real device feed) and **Simulation**
//! (scripted sources, recording renderers) environments.
//!
//! # Core Concept: Semantic Boundary
//!
//! The renderer trait exposes exactly the operations the tracking core
//! needs (create/move markers, resize circles, repoint polylines, bulk
//! removal) and nothing about how a map is actually drawn. Renderer-native
//! handles never leave this boundary as anything but opaque tokens.
//!
//! # Example
//!
//! ```ignore
//! use lifeline_env::{LocationSource, WatchOptions};
//!
//! async fn watch_loop<S: LocationSource>(source: &S) {
//!     let watch = source.subscribe(WatchOptions::default()).await.unwrap();
//!     while let Some(update) = source.recv(watch).await {
//!         match update {
//!             Ok(sample) => println!("fix: {:?}", sample),
//!             Err(err) => eprintln!("watch error: {err}"),
//!         }
//!     }
//! }
//! ```

mod error;
mod location;
mod renderer;
mod types;

pub use error::{LocationError, RenderError};
pub use location::{DeviceFeed, DeviceLocationSource, LocationSource, LocationUpdate, WatchOptions};
pub use renderer::{MapRenderer, MarkerStyle, RenderHandle};
pub use types::{GeoPoint, LocationSample, WatchId};
