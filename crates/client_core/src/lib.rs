pub mod blog;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod forms;
pub mod gate;
pub mod http;
pub mod info_panel;
pub mod invalidation;
pub mod links;
pub mod memory;
pub mod reorder;
pub mod service;
pub mod validation;
pub mod visits;

pub use cache::{QueryCache, QueryKey};
pub use client::{ClientEvent, SiteClient};
pub use config::{load_settings, Settings};
pub use error::{ClientError, ClientResult, ServiceError, ServiceResult};
pub use http::HttpRemoteService;
pub use memory::InMemoryService;
pub use reorder::{ReorderError, ReorderPhase, ReorderSession};
pub use service::{MissingRemoteService, RemoteService, ServiceClient};
