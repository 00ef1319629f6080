//! Top-level facade crate for the FishPi client.
//!
//! Re-exports the protocol core and the client runtime so users can depend on
//! a single crate.

pub mod core {
    pub use fishpi_core::*;
}

pub mod client {
    pub use fishpi_client::*;
}
