//! A bootstrapping configuration engine: recursively resolves layered
//! key/value resources — files, environment variables, command-line
//! arguments, providers, profiles — with `${…}` interpolation and a
//! `grep`/`sed`/`join` filter pipeline, folding everything into a single
//! ordered result.
//!
//! Start at [`System`]: build one with [`SystemBuilder`], register any
//! custom media/filters/loaders/providers it needs, then call
//! [`System::load`] with the root sources to resolve.

pub mod arena;
pub mod env;
pub mod error;
pub mod filter;
pub mod flags;
pub mod interpolate;
pub mod kv;
pub mod loader;
pub mod media;
pub mod resource;
pub mod resource_key;
mod scheduler;
pub mod stream;
pub mod system;
pub mod variables;

pub use env::{Environment, StdEnvironment};
pub use error::{Error, Result};
pub use filter::{Filter, FilterRegistry};
pub use flags::{LoadFlag, LoadFlags};
pub use kv::KeyValue;
pub use loader::{Loader, LoaderRegistry, Provider, ProviderRegistry};
pub use media::{MediaEntry, MediaRegistry};
pub use resource::{Declaration, FilterSpec, InlineNamedKeyValues, Resource};
pub use stream::KeyValues;
pub use system::{System, SystemBuilder};
pub use variables::VariablesChain;
