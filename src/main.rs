use dino::{Config, build_rocket};

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    let rocket = build_rocket(config)?;
    rocket.launch().await?;

    Ok(())
}
