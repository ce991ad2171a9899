#![feature(const_constructor, const_fn)]

#[macro_use] extern crate lazy_static;
extern crate chrono;

mod t61;
pub mod builtin;
pub mod encoding;
pub mod tokenizer;
pub mod syntax;
pub mod compiler;