mod capture;
mod dialect;
mod error;
mod executor;
mod mutation;
mod pagination;
mod returning;
mod row;
mod splitter;
mod sql_writer;
mod statement;
mod upsert;
mod util;
mod value;

pub use ::anyhow::Context;
pub use capture::*;
pub use dialect::*;
pub use error::*;
pub use executor::*;
pub use mutation::*;
pub use pagination::*;
pub use row::*;
pub use splitter::*;
pub use sql_writer::*;
pub use statement::*;
pub use upsert::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
