//! Client data store backends.

pub mod pg_store {
    pub use crate::pg_store::*;
}

pub mod supabase_client {
    pub use crate::supabase_client::*;
}

pub mod store {
    pub use crate::store::*;
}
