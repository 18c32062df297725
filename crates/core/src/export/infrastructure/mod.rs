pub mod json_document_writer;
