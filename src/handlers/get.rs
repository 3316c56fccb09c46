use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::Block;
use crate::http::Response;

use super::{errno_class, join_root};

/// Serves a static file, resolving directory index files and autoindex
/// listings the way a plain origin server would.
pub fn handle(block: &Block, uri_path: &str) -> Response {
    let path = join_root(block.root(), uri_path);
    let treat_as_dir = uri_path.ends_with('/');

    let metadata = match fs::metadata(&path) {
        Ok(m) => m,
        Err(e) => return errno_class(e.kind()),
    };

    if metadata.is_dir() || treat_as_dir {
        return serve_directory(block, &path, uri_path);
    }

    serve_file(&path)
}

fn serve_directory(block: &Block, dir: &Path, uri_path: &str) -> Response {
    for index_name in block.index_names() {
        let candidate = dir.join(&index_name);
        if candidate.is_file() {
            return serve_file(&candidate);
        }
    }

    if block.autoindex() {
        return autoindex(dir, uri_path);
    }

    Response::new(404)
}

fn serve_file(path: &Path) -> Response {
    match fs::read(path) {
        Ok(body) => {
            let mut response = Response::new(200);
            if let Some(mime) = mime_for(path) {
                response.set_header("Content-Type", mime);
            }
            response.body = body;
            response
        }
        Err(e) => errno_class(e.kind()),
    }
}

fn autoindex(dir: &Path, uri_path: &str) -> Response {
    let mut entries: Vec<String> = match fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).map(|e| e.file_name().to_string_lossy().into_owned()).collect(),
        Err(e) => return errno_class(e.kind()),
    };
    entries.sort();

    let mut body = format!("<html><body><h1>Index of {uri_path}</h1><ul>");
    for name in entries {
        body.push_str(&format!("<li><a href=\"{name}\">{name}</a></li>"));
    }
    body.push_str("</ul></body></html>");

    let mut response = Response::new(200);
    response.body = body.into_bytes();
    response
}

fn mime_for(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "html" | "htm" => Some("text/html; charset=utf-8"),
        "css" => Some("text/css"),
        "js" => Some("application/javascript"),
        "json" => Some("application/json"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}
