pub mod export_detections_use_case;
pub mod export_logger;
