// Copyright (C) 2025 The padmix authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use tracing::info;

use padmix::audio::{self, process::SystemProcesses, Directory};
use padmix::engine::{Engine, EngineEvent};
use padmix::listener::StartOutcome;
use padmix::mapping::{Store, VolumeTarget};
use padmix::midi::{self, SystemDevices};

#[derive(Parser)]
#[clap(
    author = "The padmix authors",
    version = crate_version!(),
    about = "A MIDI pad driven per-application volume mixer."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Lists the active audio sessions on the default render endpoint.
    Sessions {},
    /// Lists the saved note mappings.
    Mappings {
        /// The path to the mappings file. Defaults to the per-user file.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Sets the volume of one application, or of all of them.
    SetVolume {
        /// The process name to set, or "All Applications".
        application: String,
        /// The volume level in percent (0-100).
        percent: u8,
    },
    /// Starts the engine: listens for MIDI events and applies mappings.
    Start {
        /// The MIDI input device ordinal. Defaults to the saved one.
        #[arg(short, long)]
        device: Option<usize>,
        /// The path to the mappings file. Defaults to the per-user file.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for (index, device) in devices.iter().enumerate() {
                println!("- [{}] {}", index, device);
            }
        }
        Commands::Sessions {} => {
            let directory = Directory::new(audio::default_endpoint(), Arc::new(SystemProcesses));
            let sessions = directory.snapshots();

            if sessions.is_empty() {
                println!("No active audio sessions.");
                return Ok(());
            }

            println!("Sessions:");
            for session in sessions {
                println!(
                    "- {} (pid {}): {:.0}%",
                    session.process_name,
                    session.process_id,
                    session.volume * 100.0
                );
            }
        }
        Commands::Mappings { file } => {
            let store = Store::open(file)?;

            let mut mappings = store.list_all();
            mappings.sort_by_key(|mapping| mapping.note);

            println!("Mappings (count: {}):", mappings.len());
            for mapping in mappings {
                println!("- note {}:", mapping.note);
                for target in &mapping.targets {
                    println!("    {} = {}%", target.application, target.level);
                }
            }
            println!(
                "Selected MIDI device index: {}",
                store.selected_device_index()
            );
        }
        Commands::SetVolume {
            application,
            percent,
        } => {
            let directory = Directory::new(audio::default_endpoint(), Arc::new(SystemProcesses));

            let target = VolumeTarget::new(&application, percent);
            if target.is_all_applications() {
                directory.set_volume_all(percent);
            } else {
                directory.set_volume(&application, percent);
            }

            println!("Set volume of {} to {}%.", application, percent);
        }
        Commands::Start { device, file } => {
            let (engine, mut events) = Engine::new(
                Arc::new(SystemDevices),
                audio::default_endpoint(),
                Arc::new(SystemProcesses),
                file,
            )?;

            match engine.start(device)? {
                StartOutcome::Listening {
                    device,
                    requested,
                    used,
                } => {
                    if requested != used {
                        println!(
                            "Device index {} is out of range, using device {}.",
                            requested, used
                        );
                    }
                    println!("Listening on {}. Press ctrl-c to stop.", device);
                }
                StartOutcome::NoDevices => {
                    println!("No MIDI input devices available.");
                    return Ok(());
                }
            }

            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    match event {
                        EngineEvent::NoteReceived { note, velocity } => {
                            info!(note, velocity, "Note received.")
                        }
                        EngineEvent::VolumeChanged => info!("Volume settings applied."),
                    }
                }
            });

            tokio::signal::ctrl_c().await?;
            engine.shutdown()?;
            println!("Saved mappings.");
        }
    }

    Ok(())
}
