//! Room identifiers.
//!
//! Two forms exist:
//!
//! * `_/<instance>/<map url>` - an anonymous room. The slug is everything
//!   after the instance, so map urls may contain slashes.
//! * `@/<organization>/<world>/<room>` - a room inside an organization's world.

use crate::error::RoomIdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoomIdentifier {
    Anonymous {
        instance: String,
        slug: String,
    },
    Private {
        organization: String,
        world: String,
        room: String,
    },
}

impl RoomIdentifier {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, RoomIdentifier::Anonymous { .. })
    }
}

impl FromStr for RoomIdentifier {
    type Err = RoomIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(RoomIdError::Empty);
        }

        if let Some(rest) = s.strip_prefix("_/") {
            let (instance, slug) = rest
                .split_once('/')
                .ok_or_else(|| RoomIdError::Malformed(s.to_string()))?;
            if instance.is_empty() || slug.is_empty() {
                return Err(RoomIdError::Malformed(s.to_string()));
            }
            return Ok(RoomIdentifier::Anonymous {
                instance: instance.to_string(),
                slug: slug.to_string(),
            });
        }

        if let Some(rest) = s.strip_prefix("@/") {
            let parts: Vec<&str> = rest.split('/').collect();
            return match parts.as_slice() {
                [organization, world, room]
                    if !organization.is_empty() && !world.is_empty() && !room.is_empty() =>
                {
                    Ok(RoomIdentifier::Private {
                        organization: organization.to_string(),
                        world: world.to_string(),
                        room: room.to_string(),
                    })
                }
                _ => Err(RoomIdError::Malformed(s.to_string())),
            };
        }

        Err(RoomIdError::UnknownPrefix(s.to_string()))
    }
}

impl fmt::Display for RoomIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomIdentifier::Anonymous { instance, slug } => write!(f, "_/{}/{}", instance, slug),
            RoomIdentifier::Private {
                organization,
                world,
                room,
            } => write!(f, "@/{}/{}/{}", organization, world, room),
        }
    }
}
