pub mod headers;
pub mod responses;
