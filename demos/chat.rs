use mcpi::connection::DEFAULT_ADDRESS;
use mcpi::World;

#[tokio::main]
pub async fn main() -> mcpi::Result {
    tracing_subscriber::fmt::init();

    let args: Vec<_> = std::env::args().collect();
    let addr = match args.get(1) {
        Some(addr) => addr.as_ref(),
        None => DEFAULT_ADDRESS,
    };
    let message = match args.get(2) {
        Some(message) => message.as_ref(),
        None => "Hello, world!",
    };

    let mut world = World::connect(addr).await?;
    world.post(message).await?;
    world.disconnect().await
}
