use bluetooth_manager::domain::models::{BondState, DeviceRecord, EventReceiver};
use bluetooth_manager::domain::settings::SettingsService;
use bluetooth_manager::infrastructure::bluetooth::protocol::WorkerSignal;
use bluetooth_manager::infrastructure::bluetooth::router::{ActivityResult, Notification};
use bluetooth_manager::infrastructure::bluetooth::simulated::{SimulatedRadio, SimulatedWorker};
use bluetooth_manager::infrastructure::bluetooth::BluetoothService;
use bluetooth_manager::infrastructure::logging::init_logger;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_service = match SettingsService::new() {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to locate settings, using defaults: {}", e);
            SettingsService::with_path(std::env::temp_dir().join("bluetooth_manager.json"))
        }
    };
    let settings = settings_service.get().clone();
    let _log_guard = init_logger(&settings.log_settings)?;

    info!("Starting Bluetooth manager walkthrough");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();

    let radio = Arc::new(SimulatedRadio::disabled(vec![DeviceRecord::new(
        "Headset",
        "00:11:22:33:44:55",
    )]));
    let worker = Arc::new(SimulatedWorker::new());
    let service = BluetoothService::new(radio.clone(), worker.clone(), event_tx, &settings.session);
    let pump = tokio::spawn(service.router().run(notify_rx));

    // Enable: the radio reports back through the activity result
    let enable = service.enable_radio();
    radio.set_enabled(true);
    notify_tx.send(Notification::EnableResult(ActivityResult::Ok))?;
    let paired = enable.await?;
    println!("enable resolved with {} paired device(s)", paired.len());
    drain(&mut event_rx);

    // Scan: one device is reported twice, the bonded one is filtered out
    let scan = service.scan();
    let speaker = DeviceRecord::new("Speaker", "AA:BB:CC:DD:EE:FF");
    for _ in 0..2 {
        notify_tx.send(Notification::DeviceFound {
            device: speaker.clone(),
            bond_state: BondState::None,
        })?;
    }
    notify_tx.send(Notification::DeviceFound {
        device: DeviceRecord::new("Headset", "00:11:22:33:44:55"),
        bond_state: BondState::Bonded,
    })?;
    notify_tx.send(Notification::DiscoveryFinished)?;
    let snapshot = scan.await?;
    println!(
        "scan resolved: {} paired, {} discovered",
        snapshot.paired.len(),
        snapshot.discovered.len()
    );
    drain(&mut event_rx);

    // Connect resolves the caller; no unsolicited Connected event goes out
    let connect = service.connect(&speaker.address);
    worker.signal(WorkerSignal::Connected {
        device_name: speaker.name.clone(),
    });
    println!("connect resolved with {}", connect.await?);
    drain(&mut event_rx);

    // The link drops on its own
    worker.signal(WorkerSignal::ConnectionLost);
    drain(&mut event_rx);

    if !service.disable_radio() {
        warn!("Radio refused to turn off");
    }

    drop(notify_tx);
    pump.await?;
    info!("Walkthrough finished");
    Ok(())
}

fn drain(events: &mut EventReceiver) {
    while let Ok(event) = events.try_recv() {
        match event.payload() {
            Some(payload) => println!("event {} {}", event.name(), payload),
            None => println!("event {}", event.name()),
        }
    }
}
