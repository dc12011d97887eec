mod audio_state;
mod commands;

use std::path::PathBuf;
use std::sync::mpsc;

use audio_loopback_core::{FatalErrorAction, LoopbackError, StreamingController, TickOutcome};
use audio_loopback_cpal::CpalBackend;

use audio_state::{AppEvent, ConsoleObserver, TimerScheduler};
use commands::Command;

type Controller = StreamingController<CpalBackend, TimerScheduler>;

fn main() {
    env_logger::init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let mut config = match commands::load_configuration(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let (tx, rx) = mpsc::channel();
    let backend = CpalBackend::new();

    let devices = match backend.enumerator().list_capture_devices() {
        Ok(devices) => devices.into_iter().filter(|d| !d.name.is_empty()).collect(),
        Err(e) => {
            log::warn!("cannot list capture devices: {}", e);
            Vec::new()
        }
    };
    if config.recording_device_name.is_empty() {
        if let Some(first) = devices.first() {
            config.recording_device_name = first.name.clone();
        }
    }
    commands::print_devices(&devices, &config.recording_device_name);

    let mut controller: Controller = StreamingController::new(backend, TimerScheduler::new(tx.clone()), config);
    controller.set_observer(ConsoleObserver::new());
    commands::spawn_console_reader(tx);

    println!("press enter to start recording, 'quit' to exit");
    for event in rx {
        match event {
            AppEvent::Tick => {
                if controller.on_tick() == TickOutcome::DeviceLost {
                    log::warn!("recording stopped: device lost");
                }
            }
            AppEvent::Command(Command::Quit) | AppEvent::InputClosed => break,
            AppEvent::Command(command) => handle_command(&mut controller, command),
        }
    }

    controller.stop();
}

fn handle_command(controller: &mut Controller, command: Command) {
    match command {
        Command::Toggle => {
            if let Err(e) = controller.toggle() {
                on_start_failed(controller, &e);
            }
        }
        Command::Start => {
            if let Err(e) = controller.start() {
                on_start_failed(controller, &e);
            }
        }
        Command::Stop => {
            controller.stop();
        }
        Command::Devices => match controller.available_capture_devices() {
            Ok(devices) => commands::print_devices(&devices, &controller.config().recording_device_name),
            Err(e) => eprintln!("cannot list capture devices: {}", e),
        },
        Command::Select(selector) => {
            let devices = controller.available_capture_devices().unwrap_or_default();
            let Some(device) = commands::resolve_device(&devices, &selector) else {
                eprintln!("no capture device matches '{}'", selector);
                return;
            };
            let mut config = controller.config().clone();
            config.recording_device_name = device.name.clone();
            match controller.configure(config) {
                Ok(()) => println!("selected '{}'", device.name),
                Err(e) => eprintln!("{}", e),
            }
        }
        Command::Gain(gain) => {
            let mut config = controller.config().clone();
            config.playback_gain = gain;
            match controller.configure(config) {
                Ok(()) => println!("playback gain {} (applies on next start)", gain),
                Err(e) => eprintln!("{}", e),
            }
        }
        Command::Status => {
            println!("state: {}", controller.state());
            if let Some(diagnostics) = controller.diagnostics() {
                println!(
                    "ticks {}, samples {}, buffers queued {}",
                    diagnostics.ticks,
                    diagnostics.samples_consumed,
                    controller.queued_buffers()
                );
            }
        }
        Command::Quit => {}
    }
}

fn on_start_failed(controller: &Controller, error: &LoopbackError) {
    if error.is_fatal() && controller.config().fatal_error_action == FatalErrorAction::Exit {
        log::error!("exiting after fatal error");
        std::process::exit(1);
    }
}
