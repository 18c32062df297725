pub mod bytetrack_tracker;
pub mod execution_provider;
pub mod math;
pub mod model_resolver;
pub mod onnx_yolo_detector;
pub mod passthrough_tracker;
