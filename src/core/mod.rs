// Scoring pipeline and shared errors/models
pub mod parsing {
    pub use crate::parsing::*;
}

pub mod extractors {
    pub use crate::extractors::*;
}

pub mod badge {
    pub use crate::badge::*;
}

pub mod scoring {
    pub use crate::scoring::*;
}

pub mod reasons {
    pub use crate::reasons::*;
}

pub mod orchestrator {
    pub use crate::orchestrator::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
