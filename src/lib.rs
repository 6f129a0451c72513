pub mod cli;
pub mod ctx;
pub mod error;
pub mod io;
pub mod loo;
pub mod math;
pub mod model;
pub mod pipeline;
pub mod projection;
pub mod records;
pub mod schema;
