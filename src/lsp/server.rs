use anyhow::Result;
use std::thread;
use std::time::Duration;
use tokio::io::{stdin, stdout};
use tower_lsp::{LspService, Server};

use crate::config::Config;
use crate::lsp::backend::Backend;

/// Set to `1` by the smoke test so the server exits on its own
pub const TEST_EXIT_ENV: &str = "ECON_XML_LINT_TEST_EXIT";

/// Start the LSP server on stdio
pub async fn serve(config: Config) -> Result<()> {
    let validator = config.validator();
    log::info!(
        "starting language server with rule sets: {}",
        validator.rules().list_rule_sets().join(", ")
    );

    // Exit after a short delay so the test can read stdout to EOF
    if std::env::var(TEST_EXIT_ENV).as_deref() == Ok("1") {
        thread::spawn(|| {
            thread::sleep(Duration::from_secs(1));
            std::process::exit(0);
        });
    }

    let (service, socket) = LspService::build(move |client| Backend::new(client, validator)).finish();

    Server::new(stdin(), stdout(), socket).serve(service).await;

    Ok(())
}
