//! Structured-clone-equivalent value codec, shared by both transports.

mod value;

pub use value::{decode, encode, Encodable, TypedArrayKind, Value};
