#![no_std]

extern crate alloc;

pub mod attack;
pub mod block;
pub mod oracle;
