use anyhow::{Context, Result};
use colored::*;
use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;

use intercom::client::{CallEngine, CallStateMachine, EngineConfig, UserIntent};
use intercom::model::IceServerConfig;
use intercom::{CallState, RoomId};

use crate::feedback::ConsoleFeedback;

/// Rooms with a panel in the house.
const ROOMS: [&str; 4] = ["media-room", "main-room", "master-bedroom", "playroom"];

pub struct PanelOptions {
    pub room: RoomId,
    pub relay_url: String,
    pub ring_timeout: Option<Duration>,
    pub stun: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Call,
    Accept,
    Decline,
    HangUp,
    ToggleVideo,
    ToggleAudio,
    Refresh,
    Quit,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::Call => "Call a room",
            Action::Accept => "Accept",
            Action::Decline => "Decline",
            Action::HangUp => "Hang up",
            Action::ToggleVideo => "Toggle video",
            Action::ToggleAudio => "Toggle microphone",
            Action::Refresh => "Refresh",
            Action::Quit => "Quit",
        }
    }
}

fn actions_for(state: CallState) -> Vec<Action> {
    let mut actions = match state {
        CallState::Idle => vec![Action::Call],
        CallState::Calling => vec![Action::HangUp],
        CallState::Receiving => vec![Action::Accept, Action::Decline],
        CallState::InCall => vec![Action::ToggleVideo, Action::ToggleAudio, Action::HangUp],
    };
    actions.extend([Action::Refresh, Action::Quit]);
    actions
}

pub async fn run(options: PanelOptions) -> Result<()> {
    let mut config = EngineConfig::new(options.room.clone());
    if let Some(stun) = options.stun {
        config.ice_servers = vec![IceServerConfig::stun(stun)];
    }

    let (engine, events) = CallEngine::headless(config, options.relay_url.as_str());
    engine
        .connect()
        .await
        .with_context(|| format!("Could not reach the relay at {}", options.relay_url))?;
    println!(
        "{} {}",
        "Panel online for".green().bold(),
        options.room.as_str().bold()
    );

    let machine = CallStateMachine::new(engine, ConsoleFeedback::default())
        .with_ring_timeout(options.ring_timeout);
    let state = machine.subscribe();
    let (intents, intents_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(machine.run(events, intents_rx));
    tokio::spawn(announce_states(state.clone()));

    loop {
        let current = *state.borrow();
        let Some(action) = prompt_action(current).await? else {
            break;
        };

        let intent = match action {
            Action::Call => match prompt_room(&options.room).await? {
                Some(room) => UserIntent::Call(room),
                None => continue,
            },
            Action::Accept => UserIntent::Accept,
            Action::Decline => UserIntent::Decline,
            Action::HangUp => UserIntent::HangUp,
            Action::ToggleVideo => UserIntent::ToggleVideo,
            Action::ToggleAudio => UserIntent::ToggleAudio,
            Action::Refresh => continue,
            Action::Quit => break,
        };
        if intents.send(intent).is_err() {
            break;
        }
    }

    drop(intents);
    runner.await.context("Panel task failed")?;
    info!("Panel for '{}' closed", options.room);
    Ok(())
}

async fn prompt_action(state: CallState) -> Result<Option<Action>> {
    let actions = actions_for(state);
    let labels: Vec<&'static str> = actions.iter().map(|a| a.label()).collect();
    let prompt = format!("[{}]", state);

    let choice = tokio::task::spawn_blocking(move || {
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact_opt()
    })
    .await??;

    Ok(choice.map(|i| actions[i]))
}

async fn prompt_room(own: &RoomId) -> Result<Option<RoomId>> {
    let rooms: Vec<&'static str> = ROOMS
        .into_iter()
        .filter(|r| *r != own.as_str())
        .collect();
    let labels = rooms.clone();

    let choice = tokio::task::spawn_blocking(move || {
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Call which room?")
            .items(&labels)
            .default(0)
            .interact_opt()
    })
    .await??;

    Ok(choice.map(|i| RoomId::from(rooms[i])))
}

async fn announce_states(mut state: watch::Receiver<CallState>) {
    while state.changed().await.is_ok() {
        let current = *state.borrow_and_update();
        let line = match current {
            CallState::Idle => "idle".normal(),
            CallState::Calling => "calling".cyan(),
            CallState::Receiving => "incoming call".yellow().bold(),
            CallState::InCall => "in call".green().bold(),
        };
        println!("{} {}", "●".bold(), line);
    }
}
