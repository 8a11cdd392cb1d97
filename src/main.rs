use anyhow::Result;

use tavid::app::App;
use tavid::backend::BackendClient;
use tavid::config::Config;
use tavid::identity::IdentityStore;
use tavid::{handler, tui, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());
    let backend = BackendClient::new(&config.api_base());
    let identity = IdentityStore::new()?;

    let mut app = App::new(backend, identity)?;
    // Load any stored conversation for the bootstrapped id; failures here are
    // swallowed so a dead backend never blocks the UI.
    app.spawn_history_load();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event).await?;
        } else {
            break;
        }
    }

    Ok(())
}
