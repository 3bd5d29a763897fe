//! Raspberry Juice Extensions
//!
//! https://dev.bukkit.org/projects/raspberryjuice

use super::*;
use crate::command_library;
use crate::entity::JavaEntityType;

command_library!(
    mod RaspberryJuice {
        // ## World APIs

        pub req WorldGetBlocks("world.getBlocks", coords_1, coords_2) {
            coords_1: TileCoords,
            coords_2: TileCoords,
        }

        pub req WorldGetPlayerId("world.getPlayerId", name) {
            name: String,
        }

        /// Lists loaded entities, optionally only those of one type.
        pub req WorldGetEntities("world.getEntities", entity_type.unwrap_or(JavaEntityType::ANY)) {
            entity_type: Option<JavaEntityType>,
        }

        /// Replies with the number of entities removed.
        pub req WorldRemoveEntity("world.removeEntity", entity_id) {
            entity_id: EntityId,
        }

        /// Replies with the number of entities removed.
        pub req WorldRemoveEntities("world.removeEntities", entity_type.unwrap_or(JavaEntityType::ANY)) {
            entity_type: Option<JavaEntityType>,
        }

        /// Places a sign with up to four lines of text.
        ///
        /// Lines are sent verbatim, see [`crate::World::set_sign`] for a
        /// version that makes them safe to send.
        pub cmd WorldSetSign("world.setSign", coords, tile, data, lines) {
            coords: TileCoords,
            tile: Tile,
            data: TileData,
            lines: Vec<String>,
        }

        /// Replies with the ID of the new entity.
        pub req WorldSpawnEntity("world.spawnEntity", coords, entity_type) {
            coords: PosCoords,
            entity_type: JavaEntityType,
        }

        pub req WorldGetEntityTypes("world.getEntityTypes") {}

        // ## Events APIs

        pub req EventsChatPosts("events.chat.posts") {}
        pub req EventsProjectileHits("events.projectile.hits") {}
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entity_type_means_any() {
        let command = WorldGetEntities { entity_type: None };
        assert_eq!(Arg::join(&command.args()), "-1");

        let command = WorldRemoveEntities {
            entity_type: Some(JavaEntityType::CREEPER),
        };
        assert_eq!(Arg::join(&command.args()), "50");
    }

    #[test]
    fn sign_lines_follow_the_block() {
        let command = WorldSetSign {
            coords: Point3::new(1, 2, 3),
            tile: Tile::SIGN,
            data: TileData(4),
            lines: vec!["Hello".into(), "World".into()],
        };
        assert_eq!(Arg::join(&command.args()), "1,2,3,63,4,Hello,World");
    }

    #[test]
    fn spawn_position_is_a_float_point() {
        let command = WorldSpawnEntity {
            coords: Point3::new(0.5, 64.0, -1.5),
            entity_type: JavaEntityType::PIG,
        };
        assert_eq!(Arg::join(&command.args()), "0.5,64,-1.5,90");
    }
}
