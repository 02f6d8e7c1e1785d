// Domain-layer modules and shared models
pub mod extract {
    pub use crate::extract::*;
}

pub mod generator {
    pub use crate::generator::*;
}

pub mod sections {
    pub use crate::sections::*;
}

pub mod export {
    pub use crate::export::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod store {
    pub use crate::store::*;
}
