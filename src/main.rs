use std::env;
use std::path::PathBuf;

use embed_player::config::PlayerConfig;
use mimalloc::MiMalloc;
use structopt::StructOpt;
use tracing::*;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const RUST_LOG: &str = "RUST_LOG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if env::var_os(RUST_LOG).is_none() {
        env::set_var(RUST_LOG, "warn,embed_player=debug,tower_http=info");
    }
    tracing_subscriber::fmt::init();

    let opts = Opts::from_args();
    let config = PlayerConfig::load(&opts.config).await?;
    info!(
        "Loaded {} embed sources from {:?}",
        config.sources.len(),
        opts.config
    );

    let state = embed_player::headless_player(config, opts.tmdb_api_key)?;
    embed_player::start_server(state, opts.port).await
}

#[derive(StructOpt)]
#[structopt(name = "embed_player", about = "Headless embed source player")]
struct Opts {
    #[structopt(short = "p", long = "port", default_value = "3000")]
    port: u16,

    #[structopt(short = "c", long = "config", parse(from_os_str), default_value = "player.json")]
    config: PathBuf,

    #[structopt(long = "tmdb-api-key", env = "TMDB_API_KEY")]
    tmdb_api_key: Option<String>,
}
