//! Daggerheart sheet engine library.
//!
//! Async orchestration around the pure `dhsheet-domain` core.
//!
//! ## Structure
//!
//! - `use_cases/` - migration, modifier and resource operations
//! - `stores/` - editor sessions and the debounced resource batcher
//! - `infrastructure/` - the document port, its adapters and configuration
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

/// Shared helpers for unit tests.
#[cfg(test)]
pub(crate) mod test_support;

pub use app::App;
