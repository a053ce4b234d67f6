//! Sprig Core
//!
//! This crate provides the core runtime for the Sprig reactive UI framework.
//! It implements:
//!
//! - Observed data with per-key dependency tracking
//! - Watchers and a batched, deduplicated update scheduler
//! - A next-tick queue that runs after pending updates
//! - Virtual nodes and a keyed reconciliation engine
//! - View instances tying data, render functions and a real tree together
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Observed data, dependencies, watchers and scheduling
//! - `vdom`: Virtual nodes, the real-tree backend trait and `patch`
//! - `instance`: Data + render function + watcher + patch
//! - `config`: Runtime settings
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use sprig_core::reactive::{observe, Runtime, Value, Watcher};
//!
//! let runtime = Runtime::new();
//! let data = Value::from(serde_json::json!({"count": 0}));
//! observe(&runtime, &data);
//!
//! let state = data.as_object().unwrap().clone();
//! let reader = state.clone();
//! let _watcher = Watcher::new(&runtime, move || {
//!     println!("count = {}", reader.get("count").unwrap().display());
//! });
//!
//! state.set("count", 1);
//! state.set("count", 2);
//! runtime.run_microtasks()?; // prints "count = 2" once
//! ```

pub mod config;
pub mod error;
pub mod instance;
pub mod reactive;
pub mod vdom;

pub use config::RuntimeConfig;
pub use error::{ConfigError, PatchError, RuntimeError, TreeError};
pub use instance::{Instance, RenderContext};
pub use reactive::{observe, Runtime, Value, Watcher};
pub use vdom::{patch, PatchTarget, TreeBackend, VNode, VNodeData};
