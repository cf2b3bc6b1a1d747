#![forbid(unsafe_code)]

pub mod body;
pub mod error;
pub mod header;
pub mod ply;
pub mod schema;
pub mod writer;

pub use body::decode_body;
pub use error::{PlyError, PlyResult};
pub use header::{parse_header, PlyHeader};
pub use ply::{read_ply, read_ply_from, read_ply_with};
pub use schema::{FieldTag, Schema};
pub use writer::{write_ply_binary, write_ply_binary_to};
