pub mod assets;
pub mod callable_object;
pub mod class_definition;
pub mod code_generator;
pub mod jaxon;
pub mod registry;
pub mod repository;
pub mod request;
pub mod request_factory;
pub mod response;
pub mod templates;

pub use crate::domain::model::{Options, RequestContext, ServerRequest, Target};
pub use crate::domain::ports::{RequestPlugin, ScriptGenerator, Storage};
pub use crate::utils::error::Result;
