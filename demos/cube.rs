use mcpi::connection::commands::WorldSetBlocks;
use mcpi::connection::{ConnectOptions, Connection, Protocol, DEFAULT_ADDRESS};
use mcpi::{Tile, TileData};
use nalgebra::Point3;

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<_> = std::env::args().collect();
    let addr = match args.get(1) {
        Some(addr) => addr.as_ref(),
        None => DEFAULT_ADDRESS,
    };

    let mut connection = Connection::connect(addr, ConnectOptions::default()).await?;

    // Set all the blocks at once
    connection
        .send_command(&WorldSetBlocks {
            coords_1: Point3::new(0, 25, 0),
            coords_2: Point3::new(25, 50, 25),
            tile: Tile::SANDSTONE,
            data: TileData::default(),
        })
        .await?;

    // The same command, spelled out by hand
    connection
        .send(
            "world.setBlocks",
            &mcpi::args![
                Point3::new(0, 51, 0),
                Point3::new(25, 51, 25),
                Tile::WOOL,
                TileData::RED
            ],
        )
        .await?;

    let height = connection
        .send_receive("world.getHeight", &mcpi::args![12, 12])
        .await?;
    println!("the top of the cube is at y = {height}");

    connection.close().await?;
    Ok(())
}
