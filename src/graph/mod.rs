pub mod factory;
pub mod live;
pub mod model;
pub mod resolver;
pub mod snapshot;

pub use factory::*;
pub use live::*;
pub use model::*;
pub use resolver::*;
pub use snapshot::*;
