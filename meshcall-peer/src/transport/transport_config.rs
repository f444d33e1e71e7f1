use meshcall_core::IceServerConfig;
use meshcall_core::utils::DEFAULT_STUN_ADDR;
use webrtc::ice_transport::ice_server::RTCIceServer;

/// ICE configuration shared by every peer connection of an orchestrator.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Gather 127.0.0.1 candidates too; only useful when every peer runs on
    /// this machine.
    pub include_loopback: bool,
}

impl TransportConfig {
    /// No STUN/TURN: host candidates only. Enough for peers on one machine or LAN.
    pub fn host_only() -> Self {
        Self {
            ice_servers: Vec::new(),
            include_loopback: false,
        }
    }

    /// Host candidates including loopback, for peers on the same machine.
    pub fn local_machine() -> Self {
        Self {
            include_loopback: true,
            ..Self::host_only()
        }
    }

    pub fn with_ice_server(mut self, server: IceServerConfig) -> Self {
        self.ice_servers.push(server);
        self
    }

    pub(crate) fn rtc_ice_servers(&self) -> Vec<RTCIceServer> {
        self.ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect()
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
            include_loopback: false,
        }
    }
}
