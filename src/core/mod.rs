// Domain-layer modules: the pure derivation steps and shared errors/models
pub mod allocation {
    pub use crate::allocation::*;
}

pub mod goals {
    pub use crate::goals::*;
}

pub mod metrics {
    pub use crate::metrics::*;
}

pub mod risk {
    pub use crate::risk::*;
}

pub mod synthesis {
    pub use crate::synthesis::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
