pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::plugins::{CallableClassPlugin, CallableFunctionPlugin, Function};
pub use config::toml_config::JaxonConfig;
pub use core::class_definition::{
    CallableClass, ClassCatalog, ClassDefinition, Container, HasCallableClass,
};
pub use core::jaxon::{Jaxon, VERSION};
pub use core::request_factory::{Parameter, Quote, RequestBuilder};
pub use core::response::ResponseManager;
pub use domain::model::ServerRequest;
pub use domain::response::Response;
pub use utils::error::{JaxonError, Result};
