#![allow(dead_code)]

pub mod entities;
pub mod recording_client;
pub mod strategies;

pub use entities::*;
#[allow(unused_imports)]
pub use recording_client::*;
