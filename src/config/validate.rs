use std::collections::{HashMap, HashSet};

use super::types::ServerConfig;
use crate::{error, warn};

/// Drops server blocks that collide on an exact bind/name triple, or that mix
/// a wildcard bind with a specific address on the same port (unresolvable).
/// Runs once at startup; never touches the request path.
pub fn validate_configs(configs: Vec<ServerConfig>) -> Vec<ServerConfig> {
    let mut drop_indices = HashSet::new();

    let mut usage_map: HashMap<(String, u16, String), Vec<usize>> = HashMap::new();
    for (idx, config) in configs.iter().enumerate() {
        for port in &config.ports {
            let key = (config.host.clone(), *port, config.server_name.clone());
            usage_map.entry(key).or_default().push(idx);
        }
    }
    for ((host, port, server_name), indices) in usage_map {
        if indices.len() > 1 {
            error!(
                "conflict: multiple servers bound to {}:{} named '{}', dropping",
                host, port, server_name
            );
            drop_indices.extend(indices);
        }
    }

    let mut port_hosts: HashMap<u16, HashSet<String>> = HashMap::new();
    for config in &configs {
        for port in &config.ports {
            port_hosts.entry(*port).or_default().insert(config.host.clone());
        }
    }
    for (port, hosts) in port_hosts {
        if hosts.contains("0.0.0.0") && hosts.len() > 1 {
            error!(
                "bind conflict: port {} mixes wildcard 0.0.0.0 with specific hosts {:?}",
                port, hosts
            );
            for (idx, config) in configs.iter().enumerate() {
                if config.ports.contains(&port) {
                    drop_indices.insert(idx);
                }
            }
        }
    }

    for (idx, config) in configs.iter().enumerate() {
        for code in config.error_pages.keys() {
            if *code < 100 || *code > 599 {
                error!(
                    "server '{}' has invalid error page status code {}",
                    config.server_name, code
                );
                drop_indices.insert(idx);
            }
        }
    }

    let dropped = drop_indices.len();
    let valid: Vec<ServerConfig> = configs
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !drop_indices.contains(idx))
        .map(|(_, c)| c)
        .collect();

    if dropped > 0 {
        warn!("{} server block(s) dropped due to configuration conflicts", dropped);
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(host: &str, ports: Vec<u16>, name: &str) -> ServerConfig {
        ServerConfig {
            host: host.to_string(),
            ports,
            server_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn no_conflicts_keeps_everything() {
        let configs = vec![
            make_config("127.0.0.1", vec![8001], "s1"),
            make_config("127.0.0.1", vec![8002], "s2"),
        ];
        assert_eq!(validate_configs(configs).len(), 2);
    }

    #[test]
    fn virtual_hosts_on_same_bind_are_ok() {
        let configs = vec![
            make_config("127.0.0.1", vec![8080], "example.com"),
            make_config("127.0.0.1", vec![8080], "api.example.com"),
        ];
        assert_eq!(validate_configs(configs).len(), 2);
    }

    #[test]
    fn exact_duplicate_drops_both() {
        let configs = vec![
            make_config("127.0.0.1", vec![8080], "same.com"),
            make_config("127.0.0.1", vec![8080], "same.com"),
            make_config("127.0.0.1", vec![8081], "other.com"),
        ];
        let valid = validate_configs(configs);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].server_name, "other.com");
    }

    #[test]
    fn wildcard_and_specific_bind_conflict() {
        let configs = vec![
            make_config("0.0.0.0", vec![8080], "s1"),
            make_config("127.0.0.1", vec![8080], "s2"),
        ];
        assert_eq!(validate_configs(configs).len(), 0);
    }

    #[test]
    fn wildcard_virtual_hosting_is_fine() {
        let configs = vec![
            make_config("0.0.0.0", vec![8080], "s1"),
            make_config("0.0.0.0", vec![8080], "s2"),
        ];
        assert_eq!(validate_configs(configs).len(), 2);
    }

    #[test]
    fn invalid_status_code_drops_block() {
        let mut config = make_config("127.0.0.1", vec![8080], "s1");
        config.error_pages.insert(99, "exists".to_string());
        assert_eq!(validate_configs(vec![config]).len(), 0);
    }
}
