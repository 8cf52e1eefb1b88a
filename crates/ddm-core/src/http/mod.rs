//! HTTP/1.1 request building and response parsing (spec.md §4.C/4.D).

mod request;
mod response;

pub use request::{build_request, range_header, MAX_REQUEST_SIZE};
pub use response::{parse_response, ReadAheadBuffer, Response, BUFFER_CAPACITY};
