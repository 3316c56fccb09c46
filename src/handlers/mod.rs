pub mod delete;
pub mod error_page;
pub mod get;

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Block, ServerBlock};
use crate::http::{Method, Request, Response};

/// Given a completed request and the Router's resolved (owning server,
/// effective block) pair, produces a final `Response`. Method gating,
/// redirection and error-body synthesis happen here; GET/DELETE do only
/// their own filesystem work.
pub fn dispatch(request: &Request, server: &Arc<ServerBlock>, block: &Block) -> Response {
    if !request.method.is_allowed(&block.allowed_methods()) {
        return finish(server, block, Response::new(405));
    }

    if let Some((target, code)) = block.redirection() {
        let mut response = Response::new(code);
        response.set_header("Location", target);
        return response;
    }

    let response = match request.method {
        Method::Get => get::handle(block, &request.uri_path),
        Method::Delete => delete::handle(block, &request.uri_path),
        _ => Response::new(501),
    };

    finish(server, block, response)
}

fn finish(server: &Arc<ServerBlock>, block: &Block, response: Response) -> Response {
    if response.status >= 400 {
        error_page::render(server.as_ref(), block, response.status)
    } else {
        response
    }
}

/// Classifies a filesystem `io::Error` into the HTTP status it should
/// surface, capturing the error class before any further syscall can
/// clobber `errno`.
fn errno_class(kind: ErrorKind) -> Response {
    let status = match kind {
        ErrorKind::NotFound => 404,
        ErrorKind::PermissionDenied => 403,
        _ => 500,
    };
    Response::new(status)
}

/// Joins a configured root with a request's URI path without producing a
/// doubled `/` at the seam.
fn join_root(root: &str, uri_path: &str) -> PathBuf {
    let root = root.trim_end_matches('/');
    let suffix = uri_path.trim_start_matches('/');
    if suffix.is_empty() {
        PathBuf::from(root)
    } else {
        PathBuf::from(root).join(suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteConfig, ServerConfig, group_by_listener};

    fn server_with_route(route: RouteConfig) -> Arc<ServerBlock> {
        let config = ServerConfig {
            routes: vec![route],
            ..Default::default()
        };
        let group = group_by_listener(std::slice::from_ref(&config));
        group.into_iter().next().unwrap().default
    }

    fn make_request(method: Method, uri_path: &str) -> Request {
        use std::time::Instant;
        let mut parser = crate::http::RequestParser::new(Instant::now());
        let line = format!("{} {} HTTP/1.1\r\nHost: x\r\n\r\n", method.as_str(), uri_path);
        parser.feed(line.as_bytes());
        parser.take_request()
    }

    #[test]
    fn method_not_allowed_yields_405() {
        let server = server_with_route(RouteConfig {
            path: "/".into(),
            methods: vec!["GET".into()],
            ..Default::default()
        });
        let block = Block::Server(server.clone());
        let request = make_request(Method::Delete, "/");
        let response = dispatch(&request, &server, &block);
        assert_eq!(response.status, 405);
    }

    #[test]
    fn redirection_sets_location_and_status() {
        let server = server_with_route(RouteConfig {
            path: "/".into(),
            redirection: Some("/new".into()),
            redirection_code: 301,
            ..Default::default()
        });
        let block = Block::Server(server.clone());
        let request = make_request(Method::Get, "/");
        let response = dispatch(&request, &server, &block);
        assert_eq!(response.status, 301);
    }

    #[test]
    fn missing_file_yields_404_with_builtin_body() {
        let dir = std::env::temp_dir().join("originserver_test_missing");
        let _ = std::fs::create_dir_all(&dir);
        let server = server_with_route(RouteConfig {
            path: "/".into(),
            root: dir.to_string_lossy().into_owned(),
            ..Default::default()
        });
        let block = Block::Server(server.clone());
        let request = make_request(Method::Get, "/nope.html");
        let mut response = dispatch(&request, &server, &block);
        assert_eq!(response.status, 404);
        response.finalize(false);
        let text = String::from_utf8(response.pending().to_vec()).unwrap();
        assert!(text.contains("404 Not Found"));
    }

    #[test]
    fn post_is_not_implemented() {
        let server = server_with_route(RouteConfig { path: "/".into(), ..Default::default() });
        let block = Block::Server(server.clone());
        let mut request = make_request(Method::Get, "/");
        request.method = Method::Post;
        let response = dispatch(&request, &server, &block);
        assert_eq!(response.status, 501);
    }
}
