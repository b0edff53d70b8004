//! Core domain entities.
//!
//! - [`Link`] - A short code and its destination
//! - [`Visit`] - One tracked request to a link, plus its value types
//!   ([`DeviceInfo`], [`ReferrerInfo`], [`GeoDescriptor`], [`LocationReading`])
//!
//! Creation inputs live next to the entity they create (`NewLink`, `NewVisit`).

pub mod link;
pub mod visit;

pub use link::{Link, LinkPatch, NewLink};
pub use visit::{
    DeviceInfo, DeviceType, GeoDescriptor, LocationReading, NewVisit, ReferrerInfo, ReferrerType,
    Visit,
};
