use std::fs;

use crate::config::Block;
use crate::http::Response;

use super::{errno_class, join_root};

/// Removes the target file. Resolves against `upload_pass` when the block
/// configures one, else the block's root, matching §4.4's DELETE path rule.
pub fn handle(block: &Block, uri_path: &str) -> Response {
    let base = block.upload_pass().unwrap_or_else(|| block.root());
    let path = join_root(base, uri_path);

    match fs::metadata(&path) {
        Ok(m) if m.is_dir() => return Response::new(403),
        Ok(_) => {}
        Err(e) => return errno_class(e.kind()),
    }

    match fs::remove_file(&path) {
        Ok(()) => Response::new(204),
        Err(e) => errno_class(e.kind()),
    }
}
