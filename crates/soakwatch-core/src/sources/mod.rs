//! Concrete source adapters.

pub mod can_bus;
pub mod host;
pub mod ping;

pub use can_bus::CanBusSource;
pub use host::HostResources;
pub use ping::PingProber;
