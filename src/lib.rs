pub mod context;
pub mod error;
pub mod gateway_state;
pub mod io_struct;
pub mod orchestrator;
pub mod readiness;
pub mod relay;
pub mod server;
pub mod upstream;

use gateway_state::{GatewayConfig, GatewayState};
use server::startup;
use tokio::signal;

pub struct Gateway {
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Self {
        Gateway { config }
    }

    pub fn start(&self) -> anyhow::Result<()> {
        let state = GatewayState::new(&self.config)?;

        actix_web::rt::System::new().block_on(async move {
            tokio::select! {
                res = startup(self.config.clone(), state) => {
                    res.map_err(anyhow::Error::from)
                }
                _ = signal::ctrl_c() => {
                    log::info!("Received Ctrl+C, shutting down");
                    Ok(())
                }
            }
        })
    }
}
