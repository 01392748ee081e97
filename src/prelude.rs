pub use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::handlers::Handlers,
    runtime::Runtime,
};
pub use anyhow::anyhow;
pub use tracing::{debug, error, info, instrument, warn};
