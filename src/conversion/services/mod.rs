//! Application services for conversion uploads.

mod coordinator;

pub use coordinator::{
    ConversionUploadCoordinator, ConversionUploadError, ConversionUploadResult,
    SingleConversionRequest, TaskUploadRequest, UploadPolling,
};
