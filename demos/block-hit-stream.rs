use std::pin::pin;
use std::time::Duration;

use futures_util::TryStreamExt;
use mcpi::connection::DEFAULT_ADDRESS;
use mcpi::World;

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<_> = std::env::args().collect();
    let addr = match args.get(1) {
        Some(addr) => addr.as_ref(),
        None => DEFAULT_ADDRESS,
    };

    let mut world = World::connect(addr).await?;
    world.events().clear().await?;

    let mut block_stream = pin!(world.block_hits(Duration::from_millis(50)));
    while let Some(hit) = block_stream.try_next().await? {
        println!(
            "block hit at {} (face: {:?}, player #{})",
            hit.coords, hit.face, hit.player_id
        );
    }

    Ok(())
}
