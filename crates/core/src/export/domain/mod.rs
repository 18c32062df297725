pub mod detection_document;
pub mod document_writer;
pub mod normalize;
