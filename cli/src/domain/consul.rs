//! Consul agent configuration and its HCL rendering.

use std::fmt::Write as _;

use crate::domain::layout::{CA_FILE, CERT_FILE, DATA_DIR, KEY_FILE, installed_tls_path};

/// Agent options rendered into `consul.hcl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsulConfig {
    pub datacenter: String,
    pub bind: Option<String>,
    pub advertise: Option<String>,
    pub client: Option<String>,
    pub server: bool,
    pub bootstrap_expect: u32,
    pub retry_join: Vec<String>,
    pub encrypt: Option<String>,
    pub tls: bool,
    pub acl: bool,
    pub agent_token: Option<String>,
    pub connect: bool,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            datacenter: "dc1".to_string(),
            bind: None,
            advertise: None,
            client: None,
            server: false,
            bootstrap_expect: 1,
            retry_join: Vec::new(),
            encrypt: None,
            tls: false,
            acl: false,
            agent_token: None,
            connect: false,
        }
    }
}

impl ConsulConfig {
    /// Render the configuration as HCL.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        attr(&mut out, 0, "datacenter", &string(&self.datacenter));
        attr(&mut out, 0, "data_dir", &string(DATA_DIR));
        for (key, value) in [
            ("bind_addr", &self.bind),
            ("advertise_addr", &self.advertise),
            ("client_addr", &self.client),
        ] {
            if let Some(value) = non_empty(value) {
                attr(&mut out, 0, key, &string(value));
            }
        }

        if self.server {
            attr(&mut out, 0, "server", "true");
            attr(&mut out, 0, "bootstrap_expect", &self.bootstrap_expect.to_string());
        }

        if !self.retry_join.is_empty() {
            let list: Vec<String> = self.retry_join.iter().map(|a| string(a)).collect();
            attr(&mut out, 0, "retry_join", &format!("[{}]", list.join(", ")));
        }

        if let Some(key) = non_empty(&self.encrypt) {
            attr(&mut out, 0, "encrypt", &string(key));
        }

        if self.tls {
            for (key, file) in [("ca_file", CA_FILE), ("cert_file", CERT_FILE), ("key_file", KEY_FILE)] {
                attr(&mut out, 0, key, &string(&installed_tls_path(file).to_string_lossy()));
            }
            attr(&mut out, 0, "verify_incoming", "true");
            attr(&mut out, 0, "verify_outgoing", "true");
            attr(&mut out, 0, "verify_server_hostname", "true");
            out.push_str("\nports {\n");
            attr(&mut out, 1, "https", "8501");
            out.push_str("}\n");
        }

        if self.connect {
            out.push_str("\nconnect {\n");
            attr(&mut out, 1, "enabled", "true");
            out.push_str("}\n");
        }

        if self.acl {
            out.push_str("\nacl {\n");
            attr(&mut out, 1, "enabled", "true");
            attr(&mut out, 1, "default_policy", &string("deny"));
            attr(&mut out, 1, "enable_token_persistence", "true");
            if let Some(token) = non_empty(&self.agent_token) {
                out.push_str("\n  tokens {\n");
                attr(&mut out, 2, "agent", &string(token));
                out.push_str("  }\n");
            }
            out.push_str("}\n");
        }

        out
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn attr(out: &mut String, depth: usize, key: &str, value: &str) {
    let _ = writeln!(out, "{:indent$}{key} = {value}", "", indent = depth * 2);
}

/// HCL string literal.
fn string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            // `${` and `%{` open template sequences.
            '$' | '%' if chars.peek() == Some(&'{') => {
                quoted.push(c);
                quoted.push(c);
            }
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
