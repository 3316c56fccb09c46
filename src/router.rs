use std::sync::Arc;

use crate::config::{Block, ListenerGroup, LocationBlock, ServerBlock};

/// Resolves the Host header (minus any `:port` suffix) against a listener
/// group's virtual hosts, falling back to that group's default server.
pub fn get_vhost(group: &ListenerGroup, host_header: &str) -> Arc<ServerBlock> {
    let name = host_header.split(':').next().unwrap_or(host_header);
    group
        .servers
        .get(name)
        .cloned()
        .unwrap_or_else(|| group.default.clone())
}

/// Resolves the first path segment of `uri` against a server's locations,
/// falling back to the server block itself if nothing matches.
pub fn get_block(server: &Arc<ServerBlock>, uri: &str) -> Block {
    let first_segment = first_segment(uri);
    let matched: Option<&Arc<LocationBlock>> = server
        .locations
        .iter()
        .find(|loc| first_segment(&loc.path) == first_segment);

    match matched {
        Some(location) => Block::Location(location.clone()),
        None => Block::Server(server.clone()),
    }
}

fn first_segment(path: &str) -> &str {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.find('/') {
        Some(idx) => &path[..idx + 1],
        None => path,
    }
}

#[derive(Debug)]
pub enum RoutingError {
    NotFound,
    MethodNotAllowed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfig, group_by_listener};

    fn sample_group() -> ListenerGroup {
        let configs = vec![
            ServerConfig {
                host: "127.0.0.1".into(),
                ports: vec![8080],
                server_name: "example.com".into(),
                routes: vec![crate::config::RouteConfig {
                    path: "/images/".into(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ServerConfig {
                host: "127.0.0.1".into(),
                ports: vec![8080],
                server_name: "api.example.com".into(),
                default_server: true,
                ..Default::default()
            },
        ];
        group_by_listener(&configs).into_iter().next().unwrap()
    }

    #[test]
    fn vhost_lookup_matches_host_header() {
        let group = sample_group();
        let vhost = get_vhost(&group, "example.com:8080");
        assert_eq!(vhost.server_name, "example.com");
    }

    #[test]
    fn vhost_lookup_falls_back_to_default() {
        let group = sample_group();
        let vhost = get_vhost(&group, "nonexistent.test");
        assert_eq!(vhost.server_name, "api.example.com");
    }

    #[test]
    fn block_lookup_matches_first_segment() {
        let group = sample_group();
        let vhost = get_vhost(&group, "example.com");
        match get_block(&vhost, "/images/cat.png") {
            Block::Location(loc) => assert_eq!(loc.path, "/images/"),
            Block::Server(_) => panic!("expected location match"),
        }
    }

    #[test]
    fn block_lookup_falls_back_to_server() {
        let group = sample_group();
        let vhost = get_vhost(&group, "example.com");
        match get_block(&vhost, "/nope") {
            Block::Server(s) => assert_eq!(s.server_name, "example.com"),
            Block::Location(_) => panic!("expected server fallback"),
        }
    }
}
