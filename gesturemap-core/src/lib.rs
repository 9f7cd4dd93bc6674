pub mod axis;
pub mod binding;
pub mod binding_set;
pub mod capability;
pub mod config;
pub mod filter;
pub mod router;
pub mod store;

pub use binding::{Binding, ButtonMapEntry};
pub use binding_set::BindingSet;
pub use capability::{
    CapabilityEntry, CapabilityRegistry, InvocationOutcome, InvocationReport, InvocationResult,
    Target,
};
pub use config::{build_binding_set, ConfigError, ProfileConfig, DEFAULT_PROFILES};
pub use router::{
    Router, RouterError, RouterEvent, RouterListener, RouterState, SourceChange, TickReport,
};
pub use store::{MappingStore, StoreError};
