use std::fs;

use crate::config::{Block, ServerBlock};
use crate::http::{Response, reason_phrase};

/// Renders the error body for `status`: the block's configured error page if
/// one is set and readable, else a minimal built-in page.
pub fn render(owner: &ServerBlock, block: &Block, status: u16) -> Response {
    let mut response = Response::new(status);

    if let Some(path) = block.error_pages(owner).get(&status) {
        if let Ok(body) = fs::read(path) {
            return response.with_body(body);
        }
    }

    let body = format!(
        "<html><body><h1>{} {}</h1></body></html>",
        status,
        reason_phrase(status)
    );
    response.body = body.into_bytes();
    response
}
