use serde::{Deserialize, Serialize};
use std::fmt;

use super::ProtocolError;

/// Kind of scene update carried by a frame.
///
/// The discriminant is the one-byte tag that prefixes every frame on the
/// subscription channel. Producer, relay and consumer are deployed
/// independently, so these values must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventKind {
    InitObject = 0x01,
    UpdateObject = 0x02,
    InitSilhouetteArea = 0x03,
    UpdateTopSilhouette = 0x04,
    UpdateBottomSilhouette = 0x05,
}

impl EventKind {
    /// Every kind, in tag order.
    pub const ALL: [EventKind; 5] = [
        EventKind::InitObject,
        EventKind::UpdateObject,
        EventKind::InitSilhouetteArea,
        EventKind::UpdateTopSilhouette,
        EventKind::UpdateBottomSilhouette,
    ];

    /// Wire tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Snake-case name, also the last segment of the ingestion route.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::InitObject => "init_object",
            EventKind::UpdateObject => "update_object",
            EventKind::InitSilhouetteArea => "init_silhouette_area",
            EventKind::UpdateTopSilhouette => "update_top_silhouette",
            EventKind::UpdateBottomSilhouette => "update_bottom_silhouette",
        }
    }

    /// HTTP path the producer posts this kind's payload to.
    pub fn route(self) -> &'static str {
        match self {
            EventKind::InitObject => "/silhouette/init_object",
            EventKind::UpdateObject => "/silhouette/update_object",
            EventKind::InitSilhouetteArea => "/silhouette/init_silhouette_area",
            EventKind::UpdateTopSilhouette => "/silhouette/update_top_silhouette",
            EventKind::UpdateBottomSilhouette => "/silhouette/update_bottom_silhouette",
        }
    }

    /// Position in [`EventKind::ALL`], used to index per-kind counters.
    pub(crate) fn index(self) -> usize {
        self.tag() as usize - 1
    }
}

impl TryFrom<u8> for EventKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(EventKind::InitObject),
            0x02 => Ok(EventKind::UpdateObject),
            0x03 => Ok(EventKind::InitSilhouetteArea),
            0x04 => Ok(EventKind::UpdateTopSilhouette),
            0x05 => Ok(EventKind::UpdateBottomSilhouette),
            other => Err(ProtocolError::UnknownTag(other)),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
