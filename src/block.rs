use std::num::ParseIntError;
use std::str::FromStr;

use derive_more::derive::{AsRef, Constructor, Display, FromStr};
use snafu::{OptionExt, Snafu};

use crate::connection::args::Arg;

/// A block that can be used in Minecraft: Pi Edition.
///
/// Vanilla blocks are available as associated constants.
///
/// See also: [Minecraft: Pi Edition Complete Block List](https://mcpirevival.miraheze.org/wiki/Minecraft:_Pi_Edition_Complete_Block_List)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, FromStr)]
pub struct Tile(pub u8);

impl Tile {
    pub const AIR: Self = Self(0);
    pub const STONE: Self = Self(1);
    pub const GRASS_BLOCK: Self = Self(2);
    pub const DIRT: Self = Self(3);
    pub const COBBLESTONE: Self = Self(4);
    pub const PLANKS: Self = Self(5);
    pub const SAPLING: Self = Self(6);
    pub const BEDROCK: Self = Self(7);
    pub const WATER: Self = Self(8);
    pub const STILL_WATER: Self = Self(9);
    pub const LAVA: Self = Self(10);
    pub const STILL_LAVA: Self = Self(11);
    pub const SAND: Self = Self(12);
    pub const GRAVEL: Self = Self(13);
    pub const GOLD_ORE: Self = Self(14);
    pub const IRON_ORE: Self = Self(15);
    pub const COAL_ORE: Self = Self(16);
    pub const LOG: Self = Self(17);
    pub const LEAVES: Self = Self(18);
    pub const GLASS: Self = Self(20);
    pub const LAPIS_ORE: Self = Self(21);
    pub const LAPIS_BLOCK: Self = Self(22);
    pub const SANDSTONE: Self = Self(24);
    pub const BED: Self = Self(26);
    pub const COBWEB: Self = Self(30);
    pub const BUSH: Self = Self(31);
    pub const WOOL: Self = Self(35);
    pub const DANDELION: Self = Self(37);
    pub const BLUE_ROSE: Self = Self(38);
    pub const GOLD_BLOCK: Self = Self(41);
    pub const IRON_BLOCK: Self = Self(42);
    pub const DOUBLE_SLAB: Self = Self(43);
    pub const SLAB: Self = Self(44);
    pub const BRICKS: Self = Self(45);
    pub const TNT: Self = Self(46);
    pub const BOOKSHELF: Self = Self(47);
    pub const MOSSY_COBBLESTONE: Self = Self(48);
    pub const OBSIDIAN: Self = Self(49);
    pub const TORCH: Self = Self(50);
    pub const FIRE: Self = Self(51);
    pub const WOODEN_STAIRS: Self = Self(53);
    pub const CHEST: Self = Self(54);
    pub const DIAMOND_ORE: Self = Self(56);
    pub const DIAMOND_BLOCK: Self = Self(57);
    pub const CRAFTING_TABLE: Self = Self(58);
    pub const FARMLAND: Self = Self(60);
    pub const FURNACE: Self = Self(61);
    /// A standing sign; its data is the facing rotation (0-15, 0 = south).
    pub const SIGN: Self = Self(63);
    pub const WOODEN_DOOR: Self = Self(64);
    pub const LADDER: Self = Self(65);
    pub const COBBLESTONE_STAIRS: Self = Self(67);
    /// A sign attached to a wall; its data is the facing direction
    /// (2 = north, 3 = south, 4 = west, 5 = east).
    pub const WALL_SIGN: Self = Self(68);
    pub const IRON_DOOR: Self = Self(71);
    pub const REDSTONE_ORE: Self = Self(73);
    pub const SNOW: Self = Self(78);
    pub const ICE: Self = Self(79);
    pub const SNOW_BLOCK: Self = Self(80);
    pub const CACTUS: Self = Self(81);
    pub const CLAY: Self = Self(82);
    pub const SUGARCANE: Self = Self(83);
    pub const FENCE: Self = Self(85);
    pub const GLOWSTONE: Self = Self(89);
    #[doc(alias = "BARRIER")]
    pub const INVISIBLE_BEDROCK: Self = Self(95);
    pub const STONE_BRICKS: Self = Self(98);
    pub const GLASS_PANE: Self = Self(102);
    pub const MELON: Self = Self(103);
    pub const FENCE_GATE: Self = Self(107);
    pub const GLOWING_OBSIDIAN: Self = Self(246);
    pub const NETHER_REACTOR_CORE: Self = Self(247);
}

/// Extra data that can be attached to a block, specific to that block type.
///
/// For many blocks, this data is used to represent the block's state, such as
/// growth stage or orientation.
#[derive(
    Debug, Clone, Default, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRef, Display, FromStr,
)]
#[as_ref(forward)]
pub struct TileData(pub u8);

impl TileData {
    // Used with blocks that do not have tile data
    pub const NONE: Self = Self(0);

    // WOOL
    pub const WHITE: Self = Self(0);
    pub const ORANGE: Self = Self(1);
    pub const MAGENTA: Self = Self(2);
    pub const LIGHT_BLUE: Self = Self(3);
    pub const YELLOW: Self = Self(4);
    pub const LIME: Self = Self(5);
    pub const PINK: Self = Self(6);
    pub const GRAY: Self = Self(7);
    pub const LIGHT_GRAY: Self = Self(8);
    pub const CYAN: Self = Self(9);
    pub const PURPLE: Self = Self(10);
    pub const BLUE: Self = Self(11);
    pub const BROWN: Self = Self(12);
    pub const GREEN: Self = Self(13);
    pub const RED: Self = Self(14);
    pub const BLACK: Self = Self(15);
    // TNT
    pub const TNT_INACTIVE: Self = Self(0);
    pub const TNT_ACTIVE: Self = Self(1);
    // WALL_SIGN
    pub const WALL_SIGN_NORTH: Self = Self(2);
    pub const WALL_SIGN_SOUTH: Self = Self(3);
    pub const WALL_SIGN_WEST: Self = Self(4);
    pub const WALL_SIGN_EAST: Self = Self(5);
}

impl From<Tile> for Arg {
    fn from(value: Tile) -> Self {
        value.0.into()
    }
}

impl From<TileData> for Arg {
    fn from(value: TileData) -> Self {
        value.0.into()
    }
}

/// A block type and its associated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Constructor)]
pub struct Block {
    pub tile: Tile,
    pub data: TileData,
}

impl From<Tile> for Block {
    fn from(tile: Tile) -> Self {
        Self::new(tile, TileData::NONE)
    }
}

/// Blocks are sent as their tile followed by their data.
impl From<Block> for Arg {
    fn from(value: Block) -> Self {
        Self::Seq(vec![value.tile.into(), value.data.into()])
    }
}

#[derive(Debug, Snafu)]
pub enum ParseBlockError {
    NotEnoughParts,
    #[snafu(context(false))]
    ParseInt {
        source: ParseIntError,
    },
}

impl FromStr for Block {
    type Err = ParseBlockError;

    /// Parses a `world.getBlockWithData` reply such as `35,14`.
    fn from_str(s: &str) -> Result<Self, ParseBlockError> {
        let (tile, data) = s.trim().split_once(',').context(NotEnoughPartsSnafu)?;

        Ok(Self {
            tile: tile.parse()?,
            data: data.parse()?,
        })
    }
}

/// Failed to convert a block face ID to a [`BlockFace`].
#[derive(Debug, Snafu)]
#[snafu(display("Invalid block face `{id}`"))]
pub struct InvalidBlockFaceError {
    id: u8,
}

/// Represents a face of a block.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFace {
    /// The side of the block facing towards Y = -∞ (i.e. the bottom of the
    /// block).
    NegativeY = 0,
    /// The side of the block facing towards Y = ∞ (i.e. the top of the block).
    PositiveY,
    /// The side of the block facing towards Z = -∞.
    NegativeZ,
    /// The side of the block facing towards Z = ∞.
    PositiveZ,
    /// The side of the block facing towards X = -∞.
    NegativeX,
    /// The side of the block facing towards X = ∞.
    PositiveX,
}

impl TryFrom<u8> for BlockFace {
    type Error = InvalidBlockFaceError;

    fn try_from(id: u8) -> Result<Self, InvalidBlockFaceError> {
        Ok(match id {
            0 => Self::NegativeY,
            1 => Self::PositiveY,
            2 => Self::NegativeZ,
            3 => Self::PositiveZ,
            4 => Self::NegativeX,
            5 => Self::PositiveX,
            id => InvalidBlockFaceSnafu { id }.fail()?,
        })
    }
}
