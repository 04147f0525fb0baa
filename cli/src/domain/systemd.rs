//! systemd unit definition for the Consul agent.

use crate::domain::install::SupervisionMode;
use crate::domain::layout::{CONFIG_DIR, CONFIG_FILE, CONSUL_BIN, SERVICE_USER};

/// Render `consul.service` for the given supervision mode.
#[must_use]
pub fn service_unit(mode: SupervisionMode) -> String {
    format!(
        "[Unit]
Description=\"HashiCorp Consul - A service mesh solution\"
Documentation=https://www.consul.io/
Requires=network-online.target
After=network-online.target
ConditionFileNotEmpty={CONFIG_FILE}

[Service]
Type={mode}
User={SERVICE_USER}
Group={SERVICE_USER}
ExecStart={CONSUL_BIN} agent -config-dir={CONFIG_DIR}
ExecReload={CONSUL_BIN} reload
ExecStop={CONSUL_BIN} leave
KillMode=process
Restart=on-failure
LimitNOFILE=65536

[Install]
WantedBy=multi-user.target
"
    )
}
