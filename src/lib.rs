//! A client for the Minecraft: Pi Edition API.
//!
//! The API is a line-based text protocol spoken over a single TCP connection
//! (port 4711 by default). [`connection::Connection`] implements the protocol
//! itself, and [`World`] offers typed wrappers around the individual commands.
//!
//! ```no_run
//! # async fn run() -> mcpi::Result {
//! use mcpi::block::Tile;
//! use mcpi::entity::Entity;
//! use mcpi::{pos_to_tile, World};
//!
//! let mut world = World::connect("localhost:4711").await?;
//! world.post("Hello, Minecraft!").await?;
//!
//! let position = world.me().get_position().await?;
//! world.set_tile(pos_to_tile(&position), Tile::DIAMOND_BLOCK).await?;
//! # Ok(())
//! # }
//! ```

use std::num::{ParseFloatError, ParseIntError};
use std::str::FromStr;
use std::time::Duration;

use async_stream::try_stream;
use futures_core::Stream;
use nalgebra::{Point2, Point3};
use snafu::Snafu;
use tokio::net::ToSocketAddrs;

use crate::block::{InvalidBlockFaceError, ParseBlockError};
use crate::camera::Camera;
use crate::connection::commands::*;
use crate::connection::{
    ConnectOptions, Connection, ConnectionError, EntityId, Protocol, WorldSettingKey,
};
use crate::entity::{ClientPlayer, EntityInfo, EntityType, JavaEntityType, Player};
use crate::events::{BlockHit, Events};
use crate::util::records;

pub mod block;
pub mod camera;
pub mod connection;
pub mod entity;
pub mod events;
pub mod util;

pub use block::{Block, BlockFace, Tile, TileData};
pub use util::pos_to_tile;

/// An error returned by the high-level API: either the command failed, or the
/// server's response could not be understood.
#[derive(Debug, Snafu)]
pub enum WorldError {
    #[snafu(display("{source}"), context(false))]
    Connection { source: ConnectionError },
    #[snafu(display("Failed to parse server response: {source}"), context(false))]
    ParseInt { source: ParseIntError },
    #[snafu(display("Failed to parse server response: {source}"), context(false))]
    ParseFloat { source: ParseFloatError },
    #[snafu(display("{source}"), context(false))]
    ParseBlock { source: ParseBlockError },
    #[snafu(display("{source}"), context(false))]
    InvalidBlockFace { source: InvalidBlockFaceError },
    /// The server's response did not have the expected shape.
    #[snafu(display("Unexpected server response: {reply:?}"))]
    MalformedReply { reply: String },
}

impl WorldError {
    /// Whether the server rejected the request with a 'Fail' message.
    #[must_use]
    pub const fn is_request_failed(&self) -> bool {
        matches!(self, Self::Connection { source } if source.is_request_failed())
    }
}

pub type Result<T = (), E = WorldError> = std::result::Result<T, E>;

/// Parses a single-valued reply such as `64` or `-12.5`.
pub(crate) fn parse_reply<T>(reply: &str) -> Result<T>
where
    T: FromStr,
    WorldError: From<T::Err>,
{
    Ok(reply.trim().parse()?)
}

/// Replaces the characters that would break the framing of a sign command.
fn sign_line(line: &str) -> String {
    line.replace(',', ";").replace(')', "]").replace('(', "[")
}

/// A connection to a game world.
#[derive(Debug)]
pub struct World<P: Protocol = Connection> {
    connection: P,
}

impl World {
    /// Connects to the game at the given address, such as `"localhost:4711"`.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::connect_with_options(addr, ConnectOptions::default()).await
    }

    pub async fn connect_with_options(
        addr: impl ToSocketAddrs,
        options: ConnectOptions,
    ) -> Result<Self> {
        let connection = Connection::connect(addr, options).await?;
        Ok(Self::new(connection))
    }
}

impl<P: Protocol> World<P> {
    pub const fn new(connection: P) -> Self {
        Self { connection }
    }

    pub fn into_inner(self) -> P {
        self.connection
    }

    /// The underlying connection, for commands without a wrapper.
    pub fn connection(&mut self) -> &mut P {
        &mut self.connection
    }

    /// Sends a command and returns the server's raw response.
    pub async fn send_command<T: SerializableCommand>(&mut self, command: T) -> Result<String> {
        Ok(self.connection.send_command(&command).await?)
    }

    /// Gets the type of the block at the given coordinates.
    pub async fn get_tile(&mut self, coords: Point3<i32>) -> Result<Tile> {
        let reply = self.send_command(WorldGetBlock { coords }).await?;
        parse_reply(&reply)
    }

    /// Gets the type and data of the block at the given coordinates.
    pub async fn get_block(&mut self, coords: Point3<i32>) -> Result<Block> {
        let reply = self.send_command(WorldGetBlockWithData { coords }).await?;
        parse_reply(&reply)
    }

    /// Gets the types of all blocks in the cuboid between two corners.
    pub async fn get_tiles(
        &mut self,
        coords_1: Point3<i32>,
        coords_2: Point3<i32>,
    ) -> Result<Vec<Tile>> {
        let reply = self
            .send_command(WorldGetBlocks { coords_1, coords_2 })
            .await?;
        reply
            .split(',')
            .filter(|tile| !tile.is_empty())
            .map(parse_reply)
            .collect()
    }

    /// Replaces the block at the given coordinates with a tile without data.
    pub async fn set_tile(&mut self, coords: Point3<i32>, tile: Tile) -> Result {
        self.set_block(coords, &Block::from(tile)).await
    }

    pub async fn set_block(&mut self, coords: Point3<i32>, block: &Block) -> Result {
        self.send_command(WorldSetBlock {
            coords,
            tile: block.tile,
            data: block.data,
        })
        .await?;
        Ok(())
    }

    /// Fills the cuboid between two corners with a block.
    pub async fn set_blocks(
        &mut self,
        coords_1: Point3<i32>,
        coords_2: Point3<i32>,
        block: &Block,
    ) -> Result {
        self.send_command(WorldSetBlocks {
            coords_1,
            coords_2,
            tile: block.tile,
            data: block.data,
        })
        .await?;
        Ok(())
    }

    /// Places a sign ([`Tile::SIGN`] or [`Tile::WALL_SIGN`]) with up to four
    /// lines of text.
    ///
    /// Commas in the text are replaced with semicolons and parentheses with
    /// square brackets, since the server cannot tell them apart from the
    /// command's own punctuation.
    pub async fn set_sign(
        &mut self,
        coords: Point3<i32>,
        tile: Tile,
        data: TileData,
        lines: &[&str],
    ) -> Result {
        self.send_command(WorldSetSign {
            coords,
            tile,
            data,
            lines: lines.iter().map(|line| sign_line(line)).collect(),
        })
        .await?;
        Ok(())
    }

    /// Spawns an entity and returns its ID.
    pub async fn spawn_entity(
        &mut self,
        coords: Point3<f64>,
        entity_type: JavaEntityType,
    ) -> Result<EntityId> {
        let reply = self
            .send_command(WorldSpawnEntity {
                coords,
                entity_type,
            })
            .await?;
        parse_reply(&reply)
    }

    /// Gets the Y coordinate of the highest non-air block in the column at
    /// `x`, `z`.
    pub async fn get_height(&mut self, x: i32, z: i32) -> Result<i32> {
        let reply = self
            .send_command(WorldGetHeight {
                coords: Point2::new(x, z),
            })
            .await?;
        parse_reply(&reply)
    }

    /// Gets the entity IDs of all connected players.
    pub async fn get_player_ids(&mut self) -> Result<Vec<EntityId>> {
        let reply = self.send_command(WorldGetPlayerIds {}).await?;
        records(&reply).map(parse_reply).collect()
    }

    /// Gets the entity ID of the player with the given name.
    pub async fn get_player_id(&mut self, name: &str) -> Result<EntityId> {
        let reply = self
            .send_command(WorldGetPlayerId {
                name: name.to_owned(),
            })
            .await?;
        parse_reply(&reply)
    }

    /// Saves a checkpoint that the world can later be restored to.
    pub async fn save_checkpoint(&mut self) -> Result {
        self.send_command(WorldCheckpointSave {}).await?;
        Ok(())
    }

    pub async fn restore_checkpoint(&mut self) -> Result {
        self.send_command(WorldCheckpointRestore {}).await?;
        Ok(())
    }

    /// Posts a message to the game chat.
    pub async fn post(&mut self, message: &str) -> Result {
        self.send_command(ChatPost {
            message: message.to_owned(),
        })
        .await?;
        Ok(())
    }

    /// Enables or disables a world setting.
    pub async fn set(&mut self, setting: WorldSettingKey, enabled: bool) -> Result {
        self.send_command(WorldSetting {
            key: setting,
            value: enabled,
        })
        .await?;
        Ok(())
    }

    /// Lists every entity type the server knows about.
    pub async fn get_entity_types(&mut self) -> Result<Vec<EntityType>> {
        let reply = self.send_command(WorldGetEntityTypes {}).await?;
        records(&reply).map(str::parse).collect()
    }

    /// Lists all loaded entities, optionally only those of one type.
    pub async fn get_entities(
        &mut self,
        entity_type: Option<JavaEntityType>,
    ) -> Result<Vec<EntityInfo>> {
        let reply = self.send_command(WorldGetEntities { entity_type }).await?;
        records(&reply).map(str::parse).collect()
    }

    /// Removes an entity, returning how many entities were removed.
    pub async fn remove_entity(&mut self, entity_id: EntityId) -> Result<i32> {
        let reply = self.send_command(WorldRemoveEntity { entity_id }).await?;
        parse_reply(&reply)
    }

    /// Removes all loaded entities, optionally only those of one type,
    /// returning how many were removed.
    pub async fn remove_entities(&mut self, entity_type: Option<JavaEntityType>) -> Result<i32> {
        let reply = self
            .send_command(WorldRemoveEntities { entity_type })
            .await?;
        parse_reply(&reply)
    }

    /// The host player.
    pub fn me(&mut self) -> ClientPlayer<'_, P> {
        ClientPlayer::new(&mut self.connection)
    }

    /// The player or entity with the given ID.
    pub fn player(&mut self, id: EntityId) -> Player<'_, P> {
        Player::new(&mut self.connection, id)
    }

    pub fn camera(&mut self) -> Camera<'_, P> {
        Camera::new(&mut self.connection)
    }

    pub fn events(&mut self) -> Events<'_, P> {
        Events::new(&mut self.connection)
    }

    /// Polls block hits every `poll_interval` and yields them one by one.
    ///
    /// The stream ends with an error if a poll fails.
    pub fn block_hits(
        &mut self,
        poll_interval: Duration,
    ) -> impl Stream<Item = Result<BlockHit>> + '_ {
        try_stream! {
            let mut interval = tokio::time::interval(poll_interval);
            loop {
                interval.tick().await;
                for hit in self.events().poll_block_hits().await? {
                    yield hit;
                }
            }
        }
    }

    /// Flushes the connection and disconnects.
    pub async fn disconnect(mut self) -> Result {
        self.connection.close().await?;
        Ok(())
    }
}
