//! Query execution against in-process resolvers.
//!
//! Field dispatch always targets the concrete object type of the value being completed,
//! so abstract (interface and union) selections are checked element by element.

#[macro_use]
pub(crate) mod resolver;
pub(crate) mod engine;
pub(crate) mod input_coercion;
pub(crate) mod result_coercion;
