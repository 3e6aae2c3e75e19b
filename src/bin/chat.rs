//! Terminal stand-in for the mobile app.
//!
//! ```sh
//! chat                        # list events
//! chat new <name> [about]     # create an event
//! chat swipe                  # walk the user deck (l = like, s = skip, q = quit)
//! chat <event-id>             # join the event's chat; every stdin line is sent
//! ```
use std::collections::HashSet;

use anyhow::{bail, Context};
use dancewithme::{client::{Api, ChatRoom, EventsScreen, SwipeDeck}, config::ClientConfig};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::load()?;
    let api = Api::from_config(&config);
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        None => list_events(&api).await,
        Some("new") => new_event(&api, &args[1..]).await,
        Some("swipe") => swipe(&api).await,
        Some(event) => {
            let event: Uuid = event.parse().context("expected an event id")?;
            chat(api, event, &config).await
        }
    }
}

async fn list_events(api: &Api) -> anyhow::Result<()> {
    let mut screen = EventsScreen::default();
    screen.refresh(api).await;

    for event in &screen.events {
        match &event.description {
            Some(description) => println!("{}  {} - {description}", event.id, event.name),
            None => println!("{}  {}", event.id, event.name),
        }
    }
    Ok(())
}

async fn new_event(api: &Api, args: &[String]) -> anyhow::Result<()> {
    let Some(name) = args.first() else {
        bail!("usage: chat new <name> [description]");
    };

    let mut screen = EventsScreen {
        name: name.clone(),
        description: args.get(1).cloned().unwrap_or_default(),
        ..Default::default()
    };
    match screen.add_event(api).await {
        Some(event) => println!("{}  {}", event.id, event.name),
        None => bail!("event was not created"),
    }
    Ok(())
}

async fn swipe(api: &Api) -> anyhow::Result<()> {
    let mut deck = SwipeDeck::default();
    deck.refresh(api).await;

    let mut lines = BufReader::new(stdin()).lines();
    loop {
        let Some(user) = deck.current() else {
            println!("No users available. Add some users via the API.");
            return Ok(());
        };
        match &user.bio {
            Some(bio) => println!("{} - {bio}", user.name),
            None => println!("{}", user.name),
        }

        match lines.next_line().await?.as_deref().map(str::trim) {
            Some("l") => deck.like(),
            Some("s") => deck.skip(),
            Some("q") | None => return Ok(()),
            Some(_) => println!("l = like, s = skip, q = quit"),
        }
    }
}

async fn chat(api: Api, event: Uuid, config: &ClientConfig) -> anyhow::Result<()> {
    let room = ChatRoom::open(api, event, config.poll_interval).await;
    if let Some(user) = room.user() {
        println!("-- you are {}", user.name);
    }

    let mut updates = room.subscribe();
    let mut shown = HashSet::new();
    let mut lines = BufReader::new(stdin()).lines();

    loop {
        for message in updates.borrow_and_update().iter() {
            if shown.insert(message.id) {
                println!("{}: {}", message.sender.name, message.text);
            }
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    room.send(&line).await;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    room.close();
    Ok(())
}
