pub mod context;
pub mod module;
pub mod registry;
pub mod settings;

pub use context::AppContext;
pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
pub use settings::Settings;
