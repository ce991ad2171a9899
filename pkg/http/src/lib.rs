#![feature(core_intrinsics, async_await, trait_alias)]

#[macro_use] extern crate common;
#[macro_use] extern crate parsing;
#[macro_use] extern crate regexp_macros;
extern crate bytes;
extern crate libc;

mod reader;
mod common_parser;
pub mod uri;
pub mod uri_parser;
mod uri_syntax;
mod common_syntax;
mod message_syntax;
mod dns;
pub mod status_code;
pub mod body;
pub mod message;
pub mod header;
pub mod method;
pub mod request;
pub mod response;
pub mod server_handler;
pub mod client_interface;
