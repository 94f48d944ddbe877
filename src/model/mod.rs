//! Canonical codeplug model.
//!
//! Every dialect decodes into these types and encodes out of them:
//! - Channel (with its vendor option bag)
//! - Contact / DirectoryContact / AllowList
//! - Zone, ScanList and RoamingZone (one `Collection` shape)
//! - RoamingChannel
//! - Codeplug (the snapshot handed to encoders)

pub mod channel;
pub mod collection;
pub mod contact;

pub use channel::{Bandwidth, Channel, ChannelOptions, ChannelType, Power, Protocol, SquelchType};
pub use collection::{
    Codeplug, Collection, CollectionKind, Grouping, RoamingChannel, RoamingZone, ScanList, Zone,
};
pub use contact::{AllowList, CallType, Contact, DirectoryContact};
