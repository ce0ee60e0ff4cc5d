mod cli;
mod input;
mod render;
mod settings;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use plaza_common::RoomCode;
use plaza_session::{
    AvatarPose, Outbound, Participant, Phase, Quat, RoomKind, TrackedPose,
    TransportClient, Vec3,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

use crate::cli::Command;
use crate::input::{InputCommand, HELP};

/// Frame rate of the session loop.
const TICK: Duration = Duration::from_millis(16);

/// How long `join` waits for room adverts before trying the code.
const LIST_GRACE: Duration = Duration::from_secs(2);

/// The start-up action still waiting for the session to become ready.
enum Startup {
    Host { kind: RoomKind, name: String },
    Join { code: RoomCode, waited: Duration },
    List,
    Done,
}

/// A standing avatar at the origin; there is no tracking hardware here.
fn standing_pose() -> AvatarPose {
    AvatarPose {
        root_position: Vec3::ZERO,
        root_yaw: 0.0,
        head: TrackedPose::new(Vec3::new(0.0, 1.6, 0.0), Quat::default()),
        left_hand: TrackedPose::new(Vec3::new(-0.25, 1.0, 0.1), Quat::default()),
        right_hand: TrackedPose::new(Vec3::new(0.25, 1.0, 0.1), Quat::default()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    // Config is loaded before logging so its level can seed the filter.
    let loaded = match args.config.as_deref() {
        Some(path) => plaza_config::load_config_from(Path::new(path)),
        None => plaza_config::load_config(),
    };

    let directive = settings::log_directive(args.log_level.as_deref(), loaded.as_ref().ok());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::try_new(&directive)
                .unwrap_or_else(|_| EnvFilter::new(settings::DEFAULT_LOG_DIRECTIVE))
        }))
        .init();

    tracing::info!("Plaza v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Config load failed, using defaults: {e}");
            plaza_config::PlazaConfig::default()
        }
    };

    let mut startup = match args.command {
        Command::List => Startup::List,
        Command::Host { kind, name } => match kind.parse::<RoomKind>() {
            Ok(kind) => Startup::Host { kind, name },
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        Command::Join { code } => match RoomCode::parse(&code) {
            Ok(code) => Startup::Join {
                code,
                waited: Duration::ZERO,
            },
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let transport = settings::transport_config(&config.transport);
    tracing::info!(url = %transport.url, "Connecting to relay");
    let (client, mut transport_rx) = match TransportClient::connect(transport).await {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("could not reach relay: {e}");
            return ExitCode::FAILURE;
        }
    };
    let client = Arc::new(client);
    let outbound: Arc<dyn Outbound> = client.clone();

    if config.voice.enabled {
        tracing::warn!("Voice enabled but no media layer is available; calls are off");
    }
    let participant_config = settings::participant_config(&config, args.name.as_deref());
    let (mut participant, mut events) = Participant::new(participant_config, outbound, None);
    participant.set_local_pose(standing_pose());

    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    println!("{HELP}");

    loop {
        tokio::select! {
            event = transport_rx.recv() => match event {
                Some(event) => participant.handle_transport_event(event).await,
                None => {
                    tracing::info!("Transport task ended");
                    break;
                }
            },

            _ = ticker.tick() => {
                let now = Instant::now();
                let elapsed = now - last_tick;
                last_tick = now;
                participant.tick(elapsed).await;
                run_startup(&mut participant, &mut startup, elapsed).await;
            }

            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match InputCommand::parse(&line) {
                    Ok(Some(InputCommand::Quit)) => break,
                    Ok(Some(command)) => run_command(&mut participant, command).await,
                    Ok(None) => {}
                    Err(message) => println!("{message}"),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    stdin_open = false;
                }
            },
        }

        while let Ok(event) = events.try_recv() {
            if let Some(line) = render::describe(&event) {
                println!("{line}");
            }
        }
    }

    if participant.phase() == Phase::InRoom {
        if let Err(e) = participant.leave_room().await {
            tracing::debug!(error = %e, "Leave on exit failed");
        }
    }
    participant.shutdown();
    client.disconnect();
    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

/// Fire the command-line action once the relay has assigned an identity.
async fn run_startup(participant: &mut Participant, startup: &mut Startup, elapsed: Duration) {
    if participant.phase() != Phase::Idle {
        return;
    }
    let result = match startup {
        Startup::Done => return,
        Startup::List => participant.request_room_list().await,
        Startup::Host { kind, name } => {
            let (kind, name) = (*kind, name.clone());
            participant.create_room(kind, &name).await.map(|_| ())
        }
        Startup::Join { code, waited } => {
            if waited.is_zero() {
                if let Err(e) = participant.request_room_list().await {
                    tracing::debug!(error = %e, "Room list request failed");
                }
            }
            *waited += elapsed;
            let advertised = participant
                .advertised_rooms()
                .iter()
                .any(|room| room.room_id == *code);
            if !advertised && *waited < LIST_GRACE {
                return;
            }
            let code = code.as_str().to_string();
            participant.join_room(&code).await
        }
    };
    // Failures already surface as session events.
    if let Err(e) = result {
        tracing::debug!(error = %e, "Start-up action failed");
    }
    *startup = Startup::Done;
}

async fn run_command(participant: &mut Participant, command: InputCommand) {
    let result = match command {
        InputCommand::Area(kind) => participant.change_sub_area(kind).await,
        InputCommand::Name(name) => {
            participant.set_display_name(&name).await;
            println!("name set to {}", participant.display_name());
            Ok(())
        }
        InputCommand::Rooms => participant.request_room_list().await,
        InputCommand::Leave => participant.leave_room().await,
        InputCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        InputCommand::Quit => Ok(()),
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "Command failed");
    }
}
