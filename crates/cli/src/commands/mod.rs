pub mod annotate;
pub mod config;
pub mod evaluate;
pub mod functions;
pub mod outcomes;

pub use annotate::*;
pub use config::*;
pub use evaluate::*;
pub use functions::*;
pub use outcomes::*;
