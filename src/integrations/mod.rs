//! External service integrations.

pub mod data_source {
    pub use crate::data_source::*;
}

pub mod mcp_client {
    pub use crate::mcp_client::*;
}

pub mod blurb {
    pub use crate::blurb::*;
}
