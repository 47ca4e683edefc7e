//! RTQS Core - Entity Types and Priority Engine
//!
//! Record types, dimension scores and the pure priority computations.
//! All other crates depend on this. Nothing here touches the record store.

mod analytics;
mod bucket;
mod config;
mod entities;
mod enums;
mod error;
mod identity;
mod priority;
mod ranking;
mod scores;

pub use analytics::*;
pub use bucket::*;
pub use config::*;
pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
pub use priority::*;
pub use ranking::*;
pub use scores::*;
