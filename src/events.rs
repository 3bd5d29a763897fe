//! Events recorded by the game until they are polled.
//!
//! Each poll returns the events since the previous poll as `|`-separated
//! records, and the server forgets them once they have been returned.

use std::str::FromStr;

use itertools::Itertools;
use nalgebra::Point3;
use snafu::OptionExt;

use crate::block::BlockFace;
use crate::connection::commands::{
    EventsBlockHits, EventsChatPosts, EventsClear, EventsProjectileHits,
};
use crate::connection::{EntityId, Protocol};
use crate::util::records;
use crate::{MalformedReplySnafu, Result, WorldError};

/// A block that was hit by a player holding a sword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHit {
    pub coords: Point3<i32>,
    pub face: BlockFace,
    pub player_id: EntityId,
}

impl FromStr for BlockHit {
    type Err = WorldError;

    /// Parses a record such as `1,2,3,1,42`.
    fn from_str(s: &str) -> Result<Self> {
        let (x, y, z, face, player_id) = s
            .split(',')
            .collect_tuple()
            .context(MalformedReplySnafu { reply: s })?;
        Ok(Self {
            coords: Point3::new(x.parse()?, y.parse()?, z.parse()?),
            face: BlockFace::try_from(face.parse::<u8>()?)?,
            player_id: player_id.parse()?,
        })
    }
}

/// A message posted to the chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatMessage {
    pub player_id: EntityId,
    pub message: String,
}

impl FromStr for ChatMessage {
    type Err = WorldError;

    /// Parses a record such as `42,hello, world`. Everything after the first
    /// comma is the message.
    fn from_str(s: &str) -> Result<Self> {
        let (player_id, message) = s.split_once(',').context(MalformedReplySnafu { reply: s })?;
        Ok(Self {
            player_id: player_id.parse()?,
            message: message.to_owned(),
        })
    }
}

/// A projectile that hit a block or an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectileHit {
    pub coords: Point3<i32>,
    pub face: BlockFace,
    /// The name of whoever shot the projectile.
    pub origin_name: String,
    /// The name of the entity that was hit, empty if a block was hit.
    pub target_name: String,
}

impl FromStr for ProjectileHit {
    type Err = WorldError;

    /// Parses a record such as `1,2,3,1,steve,creeper`.
    fn from_str(s: &str) -> Result<Self> {
        let (x, y, z, face, origin_name, target_name) = s
            .splitn(6, ',')
            .collect_tuple()
            .context(MalformedReplySnafu { reply: s })?;
        Ok(Self {
            coords: Point3::new(x.parse()?, y.parse()?, z.parse()?),
            face: BlockFace::try_from(face.parse::<u8>()?)?,
            origin_name: origin_name.to_owned(),
            target_name: target_name.to_owned(),
        })
    }
}

/// Polls the events of all players.
#[derive(Debug)]
pub struct Events<'a, P: Protocol> {
    connection: &'a mut P,
}

impl<'a, P: Protocol> Events<'a, P> {
    pub fn new(connection: &'a mut P) -> Self {
        Self { connection }
    }

    /// Discards all pending events.
    pub async fn clear(&mut self) -> Result {
        self.connection.send_command(&EventsClear {}).await?;
        Ok(())
    }

    /// Returns the blocks hit since the last poll.
    pub async fn poll_block_hits(&mut self) -> Result<Vec<BlockHit>> {
        let reply = self.connection.send_command(&EventsBlockHits {}).await?;
        records(&reply).map(str::parse).collect()
    }

    /// Returns the chat messages posted since the last poll.
    pub async fn poll_chat_posts(&mut self) -> Result<Vec<ChatMessage>> {
        let reply = self.connection.send_command(&EventsChatPosts {}).await?;
        records(&reply).map(str::parse).collect()
    }

    /// Returns the projectile hits since the last poll.
    pub async fn poll_projectile_hits(&mut self) -> Result<Vec<ProjectileHit>> {
        let reply = self
            .connection
            .send_command(&EventsProjectileHits {})
            .await?;
        records(&reply).map(str::parse).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_block_hits() {
        let hit: BlockHit = "1,-2,3,1,42".parse().unwrap();
        assert_eq!(hit.coords, Point3::new(1, -2, 3));
        assert_eq!(hit.face, BlockFace::PositiveY);
        assert_eq!(hit.player_id, EntityId(42));

        assert!("1,2,3,9,42".parse::<BlockHit>().is_err());
        assert!("1,2,3".parse::<BlockHit>().is_err());
    }

    #[test]
    fn chat_messages_keep_their_commas() {
        let post: ChatMessage = "42,hello, world".parse().unwrap();
        assert_eq!(post.player_id, EntityId(42));
        assert_eq!(post.message, "hello, world");
    }

    #[test]
    fn parses_projectile_hits() {
        let hit: ProjectileHit = "1,2,3,4,steve,".parse().unwrap();
        assert_eq!(hit.face, BlockFace::NegativeX);
        assert_eq!(hit.origin_name, "steve");
        assert_eq!(hit.target_name, "");
    }
}
