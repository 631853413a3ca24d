mod access_evaluator;
mod file_service;
mod share_registry;

pub use access_evaluator::AccessEvaluator;
pub use file_service::FileService;
pub use share_registry::{LinkAccess, ShareRegistry};
