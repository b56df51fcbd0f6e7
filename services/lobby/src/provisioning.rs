//! Kubernetes pod/service provisioning client (spec §4.10, §6). The teacher
//! has no HTTP client of its own (`authenticator`'s HTTP surface was an
//! *inbound* Rocket server); this REST client is grounded in the
//! `reqwest`-using examples in the pack (`andrewgazelka-hyperion`'s
//! `crates/server`), adapted to the `blocking` feature since this codebase
//! has no async runtime anywhere else (spec §5's synchronous handler model).

use std::cell::Cell;
use std::fs;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use rtype_common::error::{DomainError, DomainResult};
use serde_json::json;
use slog::Logger;

use crate::config::OrchestratorConfig;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GameEndpoint {
    pub ip: String,
    pub tcp_port: u16,
    pub udp_port: u16,
}

/// A rolling allocator over `[port_pool_start, port_pool_end)` (spec §4.10
/// step 2). Tracks only what this process has handed out; the orchestrator
/// itself is the source of truth for what's actually bound cluster-wide.
struct PortPool {
    start: u16,
    end: u16,
    cursor: Cell<u16>,
}

impl PortPool {
    fn new(start: u16, end: u16) -> PortPool {
        PortPool { start, end, cursor: Cell::new(start) }
    }

    fn take_two(&self) -> (u16, u16) {
        let tcp = self.next();
        let udp = self.next();
        (tcp, udp)
    }

    fn next(&self) -> u16 {
        let port = self.cursor.get();
        let next = if port + 1 >= self.end { self.start } else { port + 1 };
        self.cursor.set(next);
        port
    }
}

#[derive(Clone)]
pub struct Provisioner {
    config: OrchestratorConfig,
    http: HttpClient,
    log: Logger,
}

impl Provisioner {
    pub fn new(config: OrchestratorConfig, log: &Logger) -> DomainResult<Provisioner> {
        let mut builder = HttpClient::builder();
        if let Ok(ca) = fs::read(&config.ca_cert_path) {
            if let Ok(cert) = reqwest::Certificate::from_pem(&ca) {
                builder = builder.add_root_certificate(cert);
            }
        }
        let http = builder.build().map_err(|err| {
            slog::error!(log, "failed to build orchestrator http client"; "error" => %err);
            DomainError::Internal
        })?;
        Ok(Provisioner { config, http, log: log.new(slog::o!("component" => "provisioner")) })
    }

    fn bearer_token(&self) -> DomainResult<String> {
        fs::read_to_string(&self.config.token_path).map(|token| token.trim().to_owned()).map_err(|err| {
            slog::error!(self.log, "failed to read service account token"; "error" => %err);
            DomainError::Internal
        })
    }

    /// `start_game(lobby_id)` steps 2-5 (spec §4.10). Step 1 (flip
    /// `game_active`) and step 6 (send `GameConnectionInfo` to members) are
    /// the caller's responsibility since they touch lobby state this crate's
    /// provisioning client has no business holding.
    pub fn provision_game(&self, lobby_id: i32) -> DomainResult<GameEndpoint> {
        let pool = PortPool::new(self.config.port_pool_start, self.config.port_pool_end);
        let (tcp_port, udp_port) = pool.take_two();
        let token = self.bearer_token()?;
        let instance = format!("pod-{}", lobby_id);

        self.create_pod(&token, &instance, tcp_port, udp_port)?;
        self.create_service(&token, &instance, tcp_port, udp_port)?;
        self.poll_service(&token, &instance, tcp_port, udp_port)
    }

    fn create_pod(&self, token: &str, instance: &str, tcp_port: u16, udp_port: u16) -> DomainResult<()> {
        let url = format!("{}/api/v1/namespaces/{}/pods", self.config.api_base, self.config.namespace);
        let manifest = json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": instance,
                "labels": { "app": "server", "instance": instance },
            },
            "spec": {
                "containers": [{
                    "name": "gamerunner",
                    "image": self.config.pod_image,
                    "args": [tcp_port.to_string(), udp_port.to_string()],
                    "ports": [
                        { "containerPort": tcp_port, "protocol": "TCP" },
                        { "containerPort": udp_port, "protocol": "UDP" },
                    ],
                }],
                "restartPolicy": "Never",
            },
        });

        let response = self.http.post(&url).bearer_auth(token).json(&manifest).send().map_err(|err| {
            slog::error!(self.log, "pod creation request failed"; "error" => %err);
            DomainError::Internal
        })?;
        if !response.status().is_success() {
            slog::error!(self.log, "pod creation rejected"; "status" => response.status().as_u16());
            return Err(DomainError::Internal);
        }
        Ok(())
    }

    fn create_service(&self, token: &str, instance: &str, tcp_port: u16, udp_port: u16) -> DomainResult<()> {
        let url = format!("{}/api/v1/namespaces/{}/services", self.config.api_base, self.config.namespace);
        let manifest = json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": { "name": instance },
            "spec": {
                "type": "LoadBalancer",
                "selector": { "app": "server", "instance": instance },
                "ports": [
                    { "name": "tcp", "port": tcp_port, "protocol": "TCP" },
                    { "name": "udp", "port": udp_port, "protocol": "UDP" },
                ],
            },
        });

        let response = self.http.post(&url).bearer_auth(token).json(&manifest).send().map_err(|err| {
            slog::error!(self.log, "service creation request failed"; "error" => %err);
            DomainError::Internal
        })?;
        if !response.status().is_success() {
            slog::error!(self.log, "service creation rejected"; "status" => response.status().as_u16());
            return Err(DomainError::Internal);
        }
        Ok(())
    }

    /// Polls the Service resource up to `service_poll_attempts` times at
    /// `service_poll_interval_secs` intervals, looking for an assigned
    /// external/cluster IP (spec §4.10 step 5).
    fn poll_service(&self, token: &str, instance: &str, tcp_port: u16, udp_port: u16) -> DomainResult<GameEndpoint> {
        let url = format!("{}/api/v1/namespaces/{}/services/{}", self.config.api_base, self.config.namespace, instance);
        let interval = Duration::from_secs(self.config.service_poll_interval_secs);

        for attempt in 0..self.config.service_poll_attempts {
            match self.http.get(&url).bearer_auth(token).send() {
                Ok(response) if response.status().is_success() => {
                    if let Ok(body) = response.json::<serde_json::Value>() {
                        if let Some(ip) = extract_load_balancer_ip(&body) {
                            return Ok(GameEndpoint { ip, tcp_port, udp_port });
                        }
                    }
                }
                Ok(response) => {
                    slog::warn!(self.log, "service poll returned non-success"; "attempt" => attempt, "status" => response.status().as_u16());
                }
                Err(err) => {
                    slog::warn!(self.log, "service poll request failed"; "attempt" => attempt, "error" => %err);
                }
            }
            thread::sleep(interval);
        }

        slog::error!(self.log, "service never reported an external ip"; "instance" => instance);
        Err(DomainError::Internal)
    }
}

fn extract_load_balancer_ip(body: &serde_json::Value) -> Option<String> {
    let ingress = body.get("status")?.get("loadBalancer")?.get("ingress")?.as_array()?;
    ingress.first().and_then(|entry| {
        entry
            .get("ip")
            .and_then(|ip| ip.as_str())
            .or_else(|| entry.get("hostname").and_then(|host| host.as_str()))
            .map(str::to_owned)
    })
}
