//! Core data models for bibliographic records and caller requests.

mod record;
mod request;

pub use record::{
    ordinal, Auxiliary, Exacts, Kind, Nonexacts, ParseYearError, Record, RecordBuilder,
    YearFilter, YearMod,
};
pub use request::{Criteria, Request, RequestError};
