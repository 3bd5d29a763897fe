//! Entities and players.
//!
//! Commands for a specific entity (`entity.getPos(id)`) and for the host player
//! (`player.getPos()`) are identical apart from their namespace and the entity
//! ID, so both are implemented once by the default methods of [`Entity`].

use std::future::Future;
use std::str::FromStr;

use derive_more::derive::{AsRef, Display, FromStr};
use itertools::Itertools;
use nalgebra::{Point3, Vector3};
use snafu::OptionExt;

use crate::args;
use crate::connection::args::Arg;
use crate::connection::{EntityId, PlayerSettingKey, Protocol};
use crate::events::{BlockHit, ChatMessage, ProjectileHit};
use crate::util::{parse_point, records};
use crate::{parse_reply, MalformedReplySnafu, Result, WorldError};

/// The search radius the Python API uses when none is given.
pub const DEFAULT_ENTITY_DISTANCE: i32 = 10;

/// An entity type supported by the Raspberry Juice API extension.
///
/// These types can be used to spawn new entities, remove ones of a certain
/// type, get a list of entities of a certain type, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRef, Display, FromStr)]
#[repr(transparent)]
pub struct JavaEntityType(pub i32);

impl JavaEntityType {
    /// Used by Raspberry Juice to signify "no filter" in a command that can be
    /// filtered by entity type.
    pub const ANY: Self = Self(-1);
    pub const EXPERIENCE_ORB: Self = Self(2);
    pub const ARROW: Self = Self(10);
    pub const SNOWBALL: Self = Self(11);
    pub const FIREBALL: Self = Self(12);
    pub const ITEM_FRAME: Self = Self(18);
    pub const PRIMED_TNT: Self = Self(20);
    pub const ARMOR_STAND: Self = Self(30);
    pub const BOAT: Self = Self(41);
    pub const MINECART: Self = Self(42);
    pub const CREEPER: Self = Self(50);
    pub const SKELETON: Self = Self(51);
    pub const SPIDER: Self = Self(52);
    pub const ZOMBIE: Self = Self(54);
    pub const SLIME: Self = Self(55);
    pub const GHAST: Self = Self(56);
    #[doc(alias = "ZOMBIE_PIGMAN")]
    pub const PIG_ZOMBIE: Self = Self(57);
    pub const ENDERMAN: Self = Self(58);
    pub const BLAZE: Self = Self(61);
    pub const ENDER_DRAGON: Self = Self(63);
    pub const WITHER: Self = Self(64);
    pub const BAT: Self = Self(65);
    pub const WITCH: Self = Self(66);
    pub const PIG: Self = Self(90);
    pub const SHEEP: Self = Self(91);
    pub const COW: Self = Self(92);
    pub const CHICKEN: Self = Self(93);
    pub const SQUID: Self = Self(94);
    pub const WOLF: Self = Self(95);
    pub const OCELOT: Self = Self(98);
    pub const IRON_GOLEM: Self = Self(99);
    pub const HORSE: Self = Self(100);
    pub const RABBIT: Self = Self(101);
    pub const PARROT: Self = Self(105);
    pub const VILLAGER: Self = Self(120);
    pub const ENDER_CRYSTAL: Self = Self(200);
}

impl From<JavaEntityType> for Arg {
    fn from(value: JavaEntityType) -> Self {
        value.0.into()
    }
}

/// An entity type known to the server, as listed by `world.getEntityTypes`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityType {
    pub id: JavaEntityType,
    pub name: String,
}

impl FromStr for EntityType {
    type Err = WorldError;

    /// Parses a record such as `90,PIG`.
    fn from_str(s: &str) -> Result<Self> {
        let (id, name) = s.split_once(',').context(MalformedReplySnafu { reply: s })?;
        Ok(Self {
            id: id.trim().parse()?,
            name: name.to_owned(),
        })
    }
}

/// A loaded entity, as listed by the `getEntities` commands.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub id: EntityId,
    pub entity_type: JavaEntityType,
    pub type_name: String,
    pub position: Point3<f64>,
}

impl FromStr for EntityInfo {
    type Err = WorldError;

    /// Parses a record such as `12,90,PIG,1.5,64.0,-3.5`.
    fn from_str(s: &str) -> Result<Self> {
        let (id, entity_type, type_name, x, y, z) = s
            .split(',')
            .collect_tuple()
            .context(MalformedReplySnafu { reply: s })?;
        Ok(Self {
            id: id.parse()?,
            entity_type: entity_type.parse()?,
            type_name: type_name.to_owned(),
            position: Point3::new(x.parse()?, y.parse()?, z.parse()?),
        })
    }
}

async fn query<E: Entity + ?Sized>(entity: &mut E, method: &str, args: Vec<Arg>) -> Result<String> {
    let name = format!("{}.{method}", E::NAMESPACE);
    let target = entity.entity_id();
    let reply = entity
        .connection()
        .send_receive(&name, &args![target, args])
        .await?;
    Ok(reply)
}

async fn command<E: Entity + ?Sized>(entity: &mut E, method: &str, args: Vec<Arg>) -> Result {
    let name = format!("{}.{method}", E::NAMESPACE);
    let target = entity.entity_id();
    entity
        .connection()
        .send(&name, &args![target, args])
        .await?;
    Ok(())
}

pub trait Entity {
    type Connection: Protocol;
    /// The API namespace of the entity's commands, `entity` or `player`.
    const NAMESPACE: &'static str;

    /// Returns the entity's ID, or None if this is the client player.
    fn entity_id(&self) -> Option<EntityId>;
    fn connection(&mut self) -> &mut Self::Connection;

    /// Gets the 3D coordinates of the entity as a floating-point Point.
    fn get_position(&mut self) -> impl Future<Output = Result<Point3<f64>>> {
        async move { parse_point(&query(self, "getPos", args![]).await?) }
    }

    /// Sets the 3D coordinates of the entity as a floating-point Point.
    fn set_position(&mut self, position: Point3<f64>) -> impl Future<Output = Result> {
        command(self, "setPos", args![position])
    }

    /// Gets the 3D coordinates of the entity as an integer Point.
    ///
    /// If the entity is standing on a block, this can be thought of as the
    /// coordinates of that block, plus 1 in the y-axis.
    fn get_tile(&mut self) -> impl Future<Output = Result<Point3<i32>>> {
        async move { parse_point(&query(self, "getTile", args![]).await?) }
    }

    /// Sets the 3D coordinates of the entity as an integer Point.
    fn set_tile(&mut self, tile: Point3<i32>) -> impl Future<Output = Result> {
        command(self, "setTile", args![tile])
    }

    /// Gets the unit vector the entity is looking along.
    fn get_direction(&mut self) -> impl Future<Output = Result<Vector3<f64>>> {
        async move {
            let point: Point3<f64> = parse_point(&query(self, "getDirection", args![]).await?)?;
            Ok(point.coords)
        }
    }

    fn set_direction(&mut self, direction: Vector3<f64>) -> impl Future<Output = Result> {
        command(self, "setDirection", args![Point3::from(direction)])
    }

    /// Gets the yaw of the entity in degrees.
    fn get_rotation(&mut self) -> impl Future<Output = Result<f64>> {
        async move { parse_reply(&query(self, "getRotation", args![]).await?) }
    }

    fn set_rotation(&mut self, yaw: f64) -> impl Future<Output = Result> {
        command(self, "setRotation", args![yaw])
    }

    /// Gets the pitch of the entity in degrees.
    fn get_pitch(&mut self) -> impl Future<Output = Result<f64>> {
        async move { parse_reply(&query(self, "getPitch", args![]).await?) }
    }

    fn set_pitch(&mut self, pitch: f64) -> impl Future<Output = Result> {
        command(self, "setPitch", args![pitch])
    }

    /// Lists the entities within `distance` blocks of this one, optionally
    /// only those of one type.
    fn get_entities(
        &mut self,
        distance: i32,
        entity_type: Option<JavaEntityType>,
    ) -> impl Future<Output = Result<Vec<EntityInfo>>> {
        async move {
            let entity_type = entity_type.unwrap_or(JavaEntityType::ANY);
            let reply = query(self, "getEntities", args![distance, entity_type]).await?;
            records(&reply).map(str::parse).collect()
        }
    }

    /// Removes the entities within `distance` blocks of this one, returning
    /// how many were removed.
    fn remove_entities(
        &mut self,
        distance: i32,
        entity_type: Option<JavaEntityType>,
    ) -> impl Future<Output = Result<i32>> {
        async move {
            let entity_type = entity_type.unwrap_or(JavaEntityType::ANY);
            parse_reply(&query(self, "removeEntities", args![distance, entity_type]).await?)
        }
    }

    /// Returns and clears the blocks this entity hit with a sword.
    fn poll_block_hits(&mut self) -> impl Future<Output = Result<Vec<BlockHit>>> {
        async move {
            let reply = query(self, "events.block.hits", args![]).await?;
            records(&reply).map(str::parse).collect()
        }
    }

    /// Returns and clears the chat messages this entity posted.
    fn poll_chat_posts(&mut self) -> impl Future<Output = Result<Vec<ChatMessage>>> {
        async move {
            let reply = query(self, "events.chat.posts", args![]).await?;
            records(&reply).map(str::parse).collect()
        }
    }

    /// Returns and clears the projectile hits caused by this entity.
    fn poll_projectile_hits(&mut self) -> impl Future<Output = Result<Vec<ProjectileHit>>> {
        async move {
            let reply = query(self, "events.projectile.hits", args![]).await?;
            records(&reply).map(str::parse).collect()
        }
    }

    /// Discards this entity's pending events.
    fn clear_events(&mut self) -> impl Future<Output = Result> {
        command(self, "events.clear", args![])
    }
}

/// A player's entity ID with a connection to their game.
///
/// This struct is used to interact with a player's entity in the game world.
#[derive(Debug)]
pub struct Player<'a, P: Protocol> {
    connection: &'a mut P,
    id: EntityId,
}

impl<'a, P: Protocol> Player<'a, P> {
    pub fn new(connection: &'a mut P, id: EntityId) -> Self {
        Self { connection, id }
    }

    /// Returns the entity ID of the player.
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Gets the name of the player, or of the entity type if this entity is
    /// not a player.
    pub async fn get_name(&mut self) -> Result<String> {
        query(self, "getName", args![]).await
    }
}

impl<P: Protocol> Entity for Player<'_, P> {
    type Connection = P;
    const NAMESPACE: &'static str = "entity";

    fn entity_id(&self) -> Option<EntityId> {
        Some(self.id)
    }

    fn connection(&mut self) -> &mut P {
        self.connection
    }
}

/// The player controlled by the host running the game.
#[derive(Debug)]
pub struct ClientPlayer<'a, P: Protocol> {
    connection: &'a mut P,
}

impl<'a, P: Protocol> ClientPlayer<'a, P> {
    pub fn new(connection: &'a mut P) -> Self {
        Self { connection }
    }

    /// Enables or disables a setting that controls the behavior or the host
    /// player.
    pub async fn set(&mut self, setting: PlayerSettingKey, enabled: bool) -> Result {
        command(self, "setting", args![setting, enabled]).await
    }

    /// Enables or disables the auto-jump setting of the host player.
    ///
    /// When enabled, the player will automatically jump when walking into a
    /// block.
    pub async fn set_autojump(&mut self, enabled: bool) -> Result {
        self.set(PlayerSettingKey::AUTOJUMP, enabled).await
    }
}

impl<P: Protocol> Entity for ClientPlayer<'_, P> {
    type Connection = P;
    const NAMESPACE: &'static str = "player";

    fn entity_id(&self) -> Option<EntityId> {
        None
    }

    fn connection(&mut self) -> &mut P {
        self.connection
    }
}
