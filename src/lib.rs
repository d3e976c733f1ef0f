// Public modules
pub mod bus;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod errors;
pub mod factory;
pub mod input;
pub mod lifecycle;
pub mod memory;
pub mod registry;
pub mod scheduler;
pub mod sensors;

// Re-export commonly used types
pub use bus::{HardwareUnit, SensorBus, UnitRef};
pub use config::{load_hub_config, HubConfig};
pub use device::{Device, DeviceIdentity};
pub use errors::{CreateError, CreateResult, LifecycleError};
pub use factory::{DeviceFactory, SfhDeviceFactory};
pub use input::{InputCore, InputSubsystem, RegistrationId};
pub use lifecycle::SensorHubClient;
pub use memory::{MemoryPool, ReportBuffer};
pub use registry::SensorRegistry;
pub use sensors::{SensorCatalog, SensorKind, SensorMask};

use tokio::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::bus::simulated::SimulatedBus;
use crate::descriptor::StaticDescriptorSizes;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

/// Build a client for the simulated unit described by `config`
pub fn build_client(config: &HubConfig) -> SensorHubClient {
    let unit = HardwareUnit::new(
        config.unit.id,
        config.unit.location.clone(),
        Box::new(SimulatedBus::new(config.sensor_mask())),
    );

    let sizes = StaticDescriptorSizes::with_overrides(&config.descriptors.to_map());
    let pool = match config.memory.limit_bytes {
        Some(limit) => MemoryPool::with_limit(limit),
        None => MemoryPool::unbounded(),
    };
    let factory = SfhDeviceFactory::new(
        SensorCatalog::new(Box::new(sizes)),
        pool,
        Box::new(InputCore::default()),
    );

    SensorHubClient::new(unit, Box::new(factory))
}

/// Run the sensor hub client with the given configuration path
pub async fn run_sensor_hub(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("[SensorHubClient] starting up...");

    let hub_config_path = format!("{}/hub.toml", config_path);
    let hub_config = load_hub_config(&hub_config_path)?;
    info!(
        "[config] unit {} at '{}', mask {:#010x}",
        hub_config.unit.id, hub_config.unit.location, hub_config.unit.sensor_mask
    );

    let mut client = build_client(&hub_config);
    let registry = client.init()?;
    info!("[registry] status:\n{}", registry.status().to_json()?);

    let period = Duration::from_millis(hub_config.scheduler.poll_interval_ms);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("[main] failed to listen for shutdown signal: {}", e);
        }
    };
    scheduler::run_report_loop(&mut client, period, shutdown).await;

    let removed = client.deinit();
    info!("[main] shut down, {} device(s) removed", removed);
    Ok(())
}
