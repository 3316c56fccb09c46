use server_proxy::config::{Block, RouteConfig, ServerConfig, group_by_listener};
use server_proxy::router::{get_block, get_vhost};

fn group_with_servers(servers: Vec<ServerConfig>) -> server_proxy::config::ListenerGroup {
    group_by_listener(&servers).into_iter().next().unwrap()
}

fn server(name: &str, default: bool, routes: Vec<RouteConfig>) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        ports: vec![8080],
        server_name: name.into(),
        default_server: default,
        routes,
        ..Default::default()
    }
}

#[test]
fn vhost_resolves_exact_host_match() {
    let group = group_with_servers(vec![
        server("example.com", true, vec![]),
        server("api.example.com", false, vec![]),
    ]);

    let vhost = get_vhost(&group, "api.example.com");
    assert_eq!(vhost.server_name, "api.example.com");
}

#[test]
fn vhost_strips_port_suffix_before_lookup() {
    let group = group_with_servers(vec![server("example.com", true, vec![])]);
    let vhost = get_vhost(&group, "example.com:8080");
    assert_eq!(vhost.server_name, "example.com");
}

#[test]
fn vhost_falls_back_to_default_for_unknown_host() {
    let group = group_with_servers(vec![
        server("example.com", false, vec![]),
        server("api.example.com", true, vec![]),
    ]);
    let vhost = get_vhost(&group, "nonexistent.test");
    assert_eq!(vhost.server_name, "api.example.com");
}

#[test]
fn block_matches_first_path_segment() {
    let group = group_with_servers(vec![server(
        "example.com",
        true,
        vec![RouteConfig { path: "/images/".into(), ..Default::default() }],
    )]);
    let vhost = get_vhost(&group, "example.com");

    match get_block(&vhost, "/images/cat.png") {
        Block::Location(loc) => assert_eq!(loc.path, "/images/"),
        Block::Server(_) => panic!("expected a location match"),
    }
}

#[test]
fn block_falls_back_to_server_when_no_location_matches() {
    let group = group_with_servers(vec![server(
        "example.com",
        true,
        vec![RouteConfig { path: "/images/".into(), ..Default::default() }],
    )]);
    let vhost = get_vhost(&group, "example.com");

    match get_block(&vhost, "/nope") {
        Block::Server(s) => assert_eq!(s.server_name, "example.com"),
        Block::Location(_) => panic!("expected the server fallback"),
    }
}
