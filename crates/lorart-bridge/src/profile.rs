use std::time::Duration;

/// Radio configuration and timing for the OTAA join handshake.
///
/// The defaults match the deployed module: LWOTAA activation, the
/// provisioned EUIs, and the timing constants the handshake was tuned
/// with. The application key never appears in `Debug` output.
#[derive(Clone)]
pub struct RadioProfile {
    /// LoRaWAN activation mode, written as `AT+MODE=<mode>`.
    pub mode: String,
    /// Device EUI, space-separated byte pairs as the module expects.
    pub dev_eui: String,
    pub app_eui: String,
    pub app_key: String,
    /// Pause after each configuration write; the module has no command
    /// acknowledgment, it just needs settle time.
    pub inter_command_delay: Duration,
    /// How long to wait for the network-join-status probe answer.
    pub probe_timeout: Duration,
    /// Global ceiling on one whole join attempt.
    pub join_timeout: Duration,
    /// `AT_ERROR` lines earlier than this after join start are leftovers
    /// from configuration and are ignored.
    pub error_grace: Duration,
}

impl Default for RadioProfile {
    fn default() -> Self {
        Self {
            mode: "LWOTAA".to_string(),
            dev_eui: "A8 40 41 68 E1 89 62 1F".to_string(),
            app_eui: "A840410000000101".to_string(),
            app_key: "138F1A42A61329A3918FC834BCAD0071".to_string(),
            inter_command_delay: Duration::from_millis(500),
            probe_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(30),
            error_grace: Duration::from_secs(3),
        }
    }
}

impl RadioProfile {
    /// The configuration commands written between probe and join, in order.
    pub fn config_commands(&self) -> [String; 4] {
        [
            format!("AT+MODE={}", self.mode),
            format!("AT+DEUI={}", self.dev_eui),
            format!("AT+APPEUI={}", self.app_eui),
            format!("AT+APPKEY={}", self.app_key),
        ]
    }
}

impl std::fmt::Debug for RadioProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioProfile")
            .field("mode", &self.mode)
            .field("dev_eui", &self.dev_eui)
            .field("app_eui", &self.app_eui)
            .field("app_key", &"<redacted>")
            .field("inter_command_delay", &self.inter_command_delay)
            .field("probe_timeout", &self.probe_timeout)
            .field("join_timeout", &self.join_timeout)
            .field("error_grace", &self.error_grace)
            .finish()
    }
}
