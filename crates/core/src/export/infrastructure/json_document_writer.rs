use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::export::domain::detection_document::OutputDocument;
use crate::export::domain::document_writer::{DocumentWriteError, DocumentWriter};

/// Writes the export as pretty-printed (2-space) UTF-8 JSON.
#[derive(Debug, Default)]
pub struct JsonDocumentWriter;

impl JsonDocumentWriter {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentWriter for JsonDocumentWriter {
    fn write(&mut self, document: &OutputDocument, path: &Path) -> Result<(), DocumentWriteError> {
        let io_err = |source: std::io::Error| DocumentWriteError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(io_err)?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, document)?;
        out.flush().map_err(io_err)
    }
}
