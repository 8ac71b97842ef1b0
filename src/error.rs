use thiserror::Error;

use crate::{frontend::ParseError, passes::IntervalError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("error parsing the control flow graph: {0}")]
    Parse(#[from] ParseError),

    #[error("error building register intervals: {0}")]
    Interval(#[from] IntervalError),

    #[error("error processing io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
