//! fishpi terminal client.
//!
//! One run mode per invocation: login, chat-room view, send mode, the
//! companion-bot bridge, or the combined chat mode.

use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use fishpi_client::app::App;
use fishpi_client::config::ConfigStore;
use fishpi_client::obs;

mod cli;

use cli::{Cli, Mode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    obs::init_tracing();
    let cli = Cli::parse();

    let Some(mode) = cli.mode else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let store = ConfigStore::open(&cli.conf)
        .with_context(|| format!("load config {}", cli.conf.display()))?;
    let app = App::new(Arc::new(store), Arc::new(obs::Console));

    tracing::info!(?mode, conf = %cli.conf.display(), "fishpi starting");
    let res = match mode {
        Mode::Login => app.login().await,
        Mode::Ws => app.chat_room(false).await,
        Mode::Chat => app.chat_room(true).await,
        Mode::Msg => app.send().await,
        Mode::Ice => app.ice().await,
    };
    res.with_context(|| format!("{mode:?} mode failed"))?;
    Ok(())
}
