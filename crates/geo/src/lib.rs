//! IP-address to human-readable location resolution, backed by a
//! bounded in-memory cache and a primary/fallback provider chain.

pub mod cache;
pub mod compose;
pub mod provider;
pub mod resolver;

pub use cache::BoundedCache;
pub use compose::{compose_source, is_local_ip};
pub use provider::{BilibiliLookup, GeoLookup, PcOnlineLookup};
pub use resolver::GeoResolver;
