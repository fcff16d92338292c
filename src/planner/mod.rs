pub mod chunks;
pub mod reconcile;

pub use chunks::*;
pub use reconcile::*;
