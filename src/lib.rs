mod base;
mod config;
mod context;
mod fetch;
pub mod icon;
mod pipeline;
pub mod platform;
mod synth;

pub use base::BaseConfigs;
pub use config::{ConfigError, JsonConfig};
pub use context::{BuildContext, ContextError, IconSource};
pub use fetch::{HttpFetcher, IconFetcher};
pub use icon::{EnsureOutcome, IconError, IconReport, IconResolver, IconSpec, Tier};
pub use pipeline::{
    resolve_platform, Pipeline, PipelineError, RunReport, APP_CONFIG, FRAMEWORK_CONFIG,
};
pub use platform::{Platform, PlatformDescriptor, PlatformError};
pub use synth::{synthesize, SynthError};
