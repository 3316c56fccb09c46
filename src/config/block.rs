use std::collections::HashMap;
use std::sync::Arc;

use super::types::{DEFAULT_FILE, DEFAULT_ROOT, RouteConfig, ServerConfig};

/// A configuration scope that resolves a request, replacing the dynamic
/// downcast between server- and location-level config the source used.
#[derive(Debug, Clone)]
pub enum Block {
    Server(Arc<ServerBlock>),
    Location(Arc<LocationBlock>),
}

#[derive(Debug)]
pub struct ServerBlock {
    pub server_name: String,
    pub default_server: bool,
    pub error_pages: HashMap<u16, String>,
    pub client_max_body_size: usize,
    /// Siblings bound to the same (host, port), keyed by server_name.
    pub virtual_hosts: HashMap<String, Arc<ServerBlock>>,
    pub locations: Vec<Arc<LocationBlock>>,
}

#[derive(Debug)]
pub struct LocationBlock {
    pub path: String,
    pub allowed_methods: Vec<String>,
    pub root: String,
    pub index_names: Vec<String>,
    pub autoindex: bool,
    pub redirection: Option<String>,
    pub redirection_code: u16,
    pub upload_pass: Option<String>,
    pub cgi_ext: Option<String>,
}

impl Block {
    /// Error pages are only ever configured at server scope; a matched
    /// location still renders errors through its owning server's pages, so
    /// the Router always keeps `Block::Server` around for that lookup too.
    pub fn error_pages<'a>(&'a self, owner: &'a ServerBlock) -> &'a HashMap<u16, String> {
        match self {
            Block::Server(s) => &s.error_pages,
            Block::Location(_) => &owner.error_pages,
        }
    }

    pub fn allowed_methods(&self) -> Vec<String> {
        match self {
            Block::Server(_) => vec!["GET".to_string()],
            Block::Location(l) => l.allowed_methods.clone(),
        }
    }

    pub fn root(&self) -> &str {
        match self {
            Block::Server(_) => DEFAULT_ROOT,
            Block::Location(l) => &l.root,
        }
    }

    pub fn index_names(&self) -> Vec<String> {
        match self {
            Block::Server(_) => vec![DEFAULT_FILE.to_string()],
            Block::Location(l) => l.index_names.clone(),
        }
    }

    pub fn autoindex(&self) -> bool {
        match self {
            Block::Server(_) => false,
            Block::Location(l) => l.autoindex,
        }
    }

    pub fn redirection(&self) -> Option<(&str, u16)> {
        match self {
            Block::Server(_) => None,
            Block::Location(l) => l.redirection.as_deref().map(|target| (target, l.redirection_code)),
        }
    }

    pub fn upload_pass(&self) -> Option<&str> {
        match self {
            Block::Server(_) => None,
            Block::Location(l) => l.upload_pass.as_deref(),
        }
    }
}

impl From<&RouteConfig> for LocationBlock {
    fn from(route: &RouteConfig) -> Self {
        LocationBlock {
            path: route.path.clone(),
            allowed_methods: route.methods.clone(),
            root: route.root.clone(),
            index_names: vec![route.default_file.clone()],
            autoindex: route.autoindex,
            redirection: route.redirection.clone(),
            redirection_code: route.redirection_code,
            upload_pass: route.upload_pass.clone(),
            cgi_ext: route.cgi_ext.clone(),
        }
    }
}

impl From<&ServerConfig> for ServerBlock {
    fn from(config: &ServerConfig) -> Self {
        ServerBlock {
            server_name: config.server_name.clone(),
            default_server: config.default_server,
            error_pages: config.error_pages.clone(),
            client_max_body_size: config.client_max_body_size,
            virtual_hosts: HashMap::new(),
            locations: config.routes.iter().map(|r| Arc::new(LocationBlock::from(r))).collect(),
        }
    }
}

/// One listener's worth of virtual hosts: the bind address/port plus every
/// `ServerBlock` sharing that listener, keyed by server_name for Host lookup.
pub struct ListenerGroup {
    pub host: String,
    pub port: u16,
    pub servers: HashMap<String, Arc<ServerBlock>>,
    pub default: Arc<ServerBlock>,
}

/// Groups a validated, flat server list by `(host, port)` into listener
/// groups, building the virtual-host map each server in a group sees.
pub fn group_by_listener(configs: &[ServerConfig]) -> Vec<ListenerGroup> {
    let mut by_bind: HashMap<(String, u16), Vec<&ServerConfig>> = HashMap::new();
    for config in configs {
        for port in &config.ports {
            by_bind.entry((config.host.clone(), *port)).or_default().push(config);
        }
    }

    by_bind
        .into_iter()
        .map(|((host, port), members)| {
            let blocks: HashMap<String, Arc<ServerBlock>> = members
                .iter()
                .map(|c| (c.server_name.clone(), Arc::new(ServerBlock::from(*c))))
                .collect();

            let mut servers = blocks.clone();
            for (name, block) in blocks.iter() {
                let mut vhosts = HashMap::new();
                for (other_name, other_block) in blocks.iter() {
                    if other_name != name {
                        vhosts.insert(other_name.clone(), other_block.clone());
                    }
                }
                let mut rebuilt = ServerBlock {
                    server_name: block.server_name.clone(),
                    default_server: block.default_server,
                    error_pages: block.error_pages.clone(),
                    client_max_body_size: block.client_max_body_size,
                    virtual_hosts: vhosts,
                    locations: block.locations.clone(),
                };
                rebuilt.virtual_hosts.insert(name.clone(), block.clone());
                servers.insert(name.clone(), Arc::new(rebuilt));
            }

            let default = members
                .iter()
                .find(|c| c.default_server)
                .or_else(|| members.first())
                .map(|c| servers.get(&c.server_name).unwrap().clone())
                .expect("a listener group always has at least one member");

            ListenerGroup { host, port, servers, default }
        })
        .collect()
}
