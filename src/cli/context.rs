use crate::config::BridgeConfig;

pub struct CliContext {
    config: BridgeConfig,
}

impl CliContext {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}
