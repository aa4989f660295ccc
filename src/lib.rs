//! Delivery-operations dashboard client.
//!
//! The interesting part lives in [`upload`] (file validation, the per-file
//! upload state machine and batch bookkeeping) and [`resource`] (cached reads
//! of dashboard endpoints). Both talk to the API through an explicitly
//! constructed [`transport::TransportClient`].

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod resource;
pub mod transport;
pub mod upload;
pub mod utils;
pub mod validator;

pub use api::DeliveryApi;
pub use config::AppConfig;
pub use error::{ConfigError, CoordinatorError, TransportError};
pub use resource::{RemoteResource, ResourceState};
pub use transport::{Transport, TransportClient};
pub use upload::{UploadCoordinator, UploadEvent, UploadFile, UploadTask};
pub use validator::UploadPolicy;
