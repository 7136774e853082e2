//! Remote flashrom execution
//!
//! A [`Flasher`] opens one [`RemoteSession`] per invocation, uploads the
//! image and the optional layout file, runs flashrom on the harness while
//! streaming its output and downloads read results. Every invocation is
//! bracketed by the pre/post flash sequences of [`crate::sequence::Rte`].

mod args;
mod executor;
mod remote;

pub use args::{
    flashrom_programmer, FlashOp, FW_PATH_READ, FW_PATH_WRITE, LAYOUT_PATH, PROGRAMMER_CH341A,
    PROGRAMMER_DEDIPROG, PROGRAMMER_RTE,
};
pub use executor::{Flasher, POST_WRITE_SETTLE};
pub use remote::{
    stream_output, ConsoleSink, Connector, OutputSink, RemoteChannel, RemoteSession,
    StreamConfig,
};
