use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::*;

use crate::lsp::backend::Backend;
use crate::lsp::document::DocumentState;
use crate::structural::{validate_and_parse, RoxmlParser, StructuralParser, XmlDocument};
use crate::validation::Severity;

const SOURCE: &str = "econ-xml-lint";

/// Trait for handling document symbols
#[tower_lsp::async_trait]
pub trait HandleDocumentSymbol {
    async fn handle_document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> LspResult<Option<DocumentSymbolResponse>>;
}

/// Trait for handling diagnostics
#[tower_lsp::async_trait]
pub trait HandleDiagnostics {
    fn create_document_state(&self, content: String, version: Option<i32>) -> DocumentState;
    async fn publish_diagnostics(&self, uri: Url);
    fn create_lsp_diagnostic(
        &self,
        validation_diagnostic: crate::validation::Diagnostic,
        content: &str,
    ) -> tower_lsp::lsp_types::Diagnostic;
}

#[tower_lsp::async_trait]
impl HandleDiagnostics for Backend {
    fn create_document_state(&self, content: String, version: Option<i32>) -> DocumentState {
        DocumentState { content, version }
    }

    /// Publish diagnostics for a document
    async fn publish_diagnostics(&self, uri: Url) {
        let (content, version) = {
            let docs = self.documents.lock().await;
            match docs.get(&uri) {
                Some(state) => (state.content.clone(), state.version),
                None => return,
            }
        };

        let checked = validate_and_parse(&self.validator, &RoxmlParser, &content);
        log::debug!("{}: {} diagnostics", uri, checked.result.diagnostics.len());

        // Convert validation results to LSP diagnostics
        let diagnostics = checked
            .result
            .diagnostics
            .into_iter()
            .map(|d| self.create_lsp_diagnostic(d, &content))
            .collect();

        self.client
            .publish_diagnostics(uri, diagnostics, version)
            .await;
    }

    fn create_lsp_diagnostic(
        &self,
        validation_diagnostic: crate::validation::Diagnostic,
        content: &str,
    ) -> tower_lsp::lsp_types::Diagnostic {
        let severity = match validation_diagnostic.severity {
            Severity::Critical | Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
        };

        // Diagnostics without a line attach to the first line
        let line = validation_diagnostic.line.unwrap_or(1).saturating_sub(1);
        let range = line_range(content, line);

        tower_lsp::lsp_types::Diagnostic::new(
            range,
            Some(severity),
            None,
            Some(SOURCE.to_string()),
            validation_diagnostic.message,
            None,
            None,
        )
    }
}

#[tower_lsp::async_trait]
impl HandleDocumentSymbol for Backend {
    async fn handle_document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> LspResult<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;

        let docs = self.documents.lock().await;
        let doc_state = match docs.get(&uri) {
            Some(state) => state,
            None => return Ok(None),
        };

        // Only a document the parser accepts has an outline
        let document = match RoxmlParser.parse(&doc_state.content) {
            Ok(document) => document,
            Err(_) => return Ok(None),
        };

        Ok(Some(DocumentSymbolResponse::Nested(outline_symbols(
            &document,
            &doc_state.content,
        ))))
    }
}

/// One symbol per entry below the root: `<type name="AKM">` becomes `AKM`
pub fn outline_symbols(document: &XmlDocument, content: &str) -> Vec<DocumentSymbol> {
    document
        .root
        .elements()
        .map(|element| {
            let line = element.line.saturating_sub(1);
            let range = line_range(content, line);
            let name = element
                .attribute("name")
                .map(str::to_string)
                .unwrap_or_else(|| element.name.clone());

            DocumentSymbol {
                name,
                detail: Some(format!("<{}>", element.name)),
                kind: SymbolKind::STRUCT,
                tags: None,
                #[allow(deprecated)]
                deprecated: None,
                range,
                selection_range: range,
                children: None,
            }
        })
        .collect()
}

/// Whole-line range for a 0-based line, measured in UTF-16 code units
fn line_range(content: &str, line: usize) -> Range {
    let width = content
        .lines()
        .nth(line)
        .map(|text| text.encode_utf16().count())
        .unwrap_or(0);

    Range::new(
        Position::new(line as u32, 0),
        Position::new(line as u32, width as u32),
    )
}
