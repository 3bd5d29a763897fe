//! A command that can be sent to the game server to perform an action or query information.
//!
//! Includes all commands supported by the vanilla Minecraft: Pi Edition game, as well as the
//! commands added by the [Raspberry Juice](https://dev.bukkit.org/projects/raspberryjuice)
//! plugin.
//!
//! Structs are generally named after the API method they correspond to.
//!
//! Commands for a specific entity or the host player (`entity.*` and `player.*`) share one
//! implementation in [`crate::entity`], because they only differ in their namespace.

use nalgebra::{Point2, Point3};

pub use self::raspberry_juice::*;
use super::args::Arg;
use super::{EntityId, WorldSettingKey};
use crate::block::{Tile, TileData};

mod raspberry_juice;

/// Values implementing this trait are commands that can be serialized and sent to the Minecraft
/// game server.
pub trait SerializableCommand {
    /// The namespaced name of the command, such as `world.setBlock`.
    const NAME: &'static str;
    /// Whether the specified command should wait for a response from the game server.
    const HAS_RESPONSE: bool;
    /// The arguments of the command, in the order the server expects them.
    #[must_use]
    fn args(&self) -> Vec<Arg>;
}

#[macro_export]
#[doc(hidden)]
macro_rules! command_library {
    // Requests have a response from the server, while commands do not.
    (@packet_awaits_response req) => { true };
    (@packet_awaits_response cmd) => { false };

    {
        mod $lib_name:ident {
            $(
                $(#[$packet_meta:meta])*
                $vis:vis $packet_type:ident $packet_name:ident ($name:literal $(, $arg:expr)*) {
                    $(
                        $(#[$field_meta:meta])*
                        $field:ident : $type:ty
                    ),*
                    $(,)?
                }
            )*
        }
    } => {
        $(
            #[derive(Debug, Clone, PartialEq)]
            $(#[$packet_meta])*
            $vis struct $packet_name {
                $(
                    $(#[$field_meta])*
                    pub $field: $type,
                )*
            }

            impl $crate::connection::commands::SerializableCommand for $packet_name {
                const NAME: &'static str = $name;
                const HAS_RESPONSE: bool = $crate::command_library!(@packet_awaits_response $packet_type);
                #[allow(clippy::clone_on_copy)]
                fn args(&self) -> Vec<$crate::connection::args::Arg> {
                    let Self {
                        $(
                            $field,
                        )*
                    } = self;
                    vec![$($crate::connection::args::Arg::from($arg.clone())),*]
                }
            }
        )*
    };
}

pub type PosCoords = Point3<f64>;
pub type TileCoords = Point3<i32>;

// # Vanilla Commands

command_library!(
    mod Vanilla {
        // ## Camera APIs

        /// Returns the camera to the normal first-person view, optionally of
        /// another entity.
        pub cmd CameraModeSetNormal("camera.mode.setNormal", target) {
            target: Option<EntityId>,
        }

        pub cmd CameraModeSetFixed("camera.mode.setFixed") {}

        pub cmd CameraModeSetFollow("camera.mode.setFollow", target) {
            target: Option<EntityId>,
        }

        pub cmd CameraSetPos("camera.setPos", coords) {
            coords: PosCoords,
        }

        // ## Chat APIs

        /// Posts a message to the in-game chat.
        ///
        /// The message is sent verbatim: commas and parentheses are not escaped.
        pub cmd ChatPost("chat.post", message) {
            message: String,
        }

        // ## World APIs

        pub req WorldGetBlock("world.getBlock", coords) {
            coords: TileCoords,
        }

        pub req WorldGetBlockWithData("world.getBlockWithData", coords) {
            coords: TileCoords,
        }

        pub cmd WorldSetBlock("world.setBlock", coords, tile, data) {
            coords: TileCoords,
            tile: Tile,
            data: TileData,
        }

        pub cmd WorldSetBlocks("world.setBlocks", coords_1, coords_2, tile, data) {
            coords_1: TileCoords,
            coords_2: TileCoords,
            tile: Tile,
            data: TileData,
        }

        pub req WorldGetHeight("world.getHeight", coords) {
            coords: Point2<i32>,
        }

        pub req WorldGetPlayerIds("world.getPlayerIds") {}

        pub cmd WorldCheckpointSave("world.checkpoint.save") {}

        pub cmd WorldCheckpointRestore("world.checkpoint.restore") {}

        pub cmd WorldSetting("world.setting", key, *value) {
            key: WorldSettingKey,
            value: bool,
        }

        // ## Event APIs

        pub cmd EventsClear("events.clear") {}

        /// Block hits are only triggered by right-clicking with a sword.
        pub req EventsBlockHits("events.block.hits") {}
    }
);
