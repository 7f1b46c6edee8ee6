use gml_build::logging::{LoggingConfig, init_logging};
use tower_lsp::{LspService, Server};

mod analysis;
mod backend;
mod index;

use backend::Backend;

#[tokio::main]
async fn main() {
    // stdout carries the protocol
    init_logging(LoggingConfig::default());
    log::info!("gml-lsp {} starting", env!("CARGO_PKG_VERSION"));

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
