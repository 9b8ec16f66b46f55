//! Wire codecs: the URL token decode table, URL fragments and bodies.

pub mod body;
pub mod url;
pub mod value;

pub use body::{read_body, write_body, Casing, WireFormat};
pub use url::{decode_fragment, encode, encode_value, parse_query};
