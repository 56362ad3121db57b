//! # Kelp VM Data
//!
//! Runtime values and the type-directed parser for data literals.
//!
//! A literal such as `[Point{1, 2.5}, Point{-3}]` is parsed against a type
//! from a module's type table. Every object the parser builds is allocated on
//! a [`Heap`]; a failed parse releases all of them before returning its error.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod heap;
pub mod lexer;
pub mod parser;
pub mod value;

pub use config::ParserConfig;
pub use error::ParseError;
pub use heap::{Heap, HeapStats};
pub use lexer::{Lexer, Token};
pub use parser::{ValueParser, parse_data, parse_value};
pub use value::{StringObj, Value, VectorObj};
