use garage_sense::identity::DeviceIdentity;
use garage_sense::{api, config, state};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

fn init_tracing(level: tracing::Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let config = config::load_from_path(&config_path)?;
    init_tracing(config.log_level());
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %config_path,
        "garage-sense starting"
    );

    let device = DeviceIdentity::from_interface(&config.hardware.network_interface);
    tracing::info!(device = %device, "Device identity resolved");
    let state = Arc::new(RwLock::new(state::AgentState::new(device.clone())));

    let _agent_handle = start_agent(&config, device, &state);

    let app = api::router(Arc::clone(&state));
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Bring up the hardware and start the agent loop on its own thread.
fn start_agent(
    config: &config::Config,
    device: DeviceIdentity,
    state: &Arc<RwLock<state::AgentState>>,
) -> Option<std::thread::JoinHandle<()>> {
    #[cfg(target_os = "linux")]
    {
        use garage_sense::agent::{Agent, Hardware, spawn_agent_thread};
        use garage_sense::clock::SystemClock;
        use garage_sense::link::mqtt::MqttChannel;
        use garage_sense::link::{ClientIdGenerator, ConnectionSupervisor};
        use garage_sense::sensor::iio::IioClimateSensor;
        use garage_sense::sensor::indicator::GpioIndicators;
        use garage_sense::sensor::mcp3008::Mcp3008;

        let hw = &config.hardware;
        let adc = match Mcp3008::new(hw.spi_bus, hw.spi_slave_select, hw.adc_channel) {
            Ok(adc) => adc,
            Err(err) => {
                tracing::error!(error = %err, "Failed to open MCP3008");
                return None;
            }
        };
        let indicators = match GpioIndicators::new(hw.open_led_pin, hw.closed_led_pin) {
            Ok(indicators) => Some(indicators),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to claim indicator pins, running without LEDs");
                None
            }
        };
        let climate = IioClimateSensor::new(hw.climate_device.clone());
        tracing::info!(device = %climate.device().display(), "Climate sensor configured");

        let clock = SystemClock::new();
        let settings = config.mqtt_settings();
        tracing::info!(host = %settings.host, port = settings.port, "Broker configured");
        let supervisor = ConnectionSupervisor::new(
            MqttChannel::new(settings),
            clock.clone(),
            device,
            ClientIdGenerator::new(config.broker.client_id_prefix.clone()),
            config.topics.door.clone(),
            config.reconnect_backoff(),
        );

        let agent = Agent::new(
            Hardware {
                adc,
                climate,
                indicators,
            },
            config.distance_model(),
            supervisor,
            clock,
            config.topics.clone(),
            config.timing(),
        )
        .with_shared_state(Arc::clone(state));

        Some(spawn_agent_thread(agent))
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = (config, device, state);
        tracing::warn!("Door agent requires Linux/Raspberry Pi - serving API only");
        None
    }
}
