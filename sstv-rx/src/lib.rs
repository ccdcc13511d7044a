//! SSTV receiver core: filter design, streaming filters, level control and the
//! VIS sync decoder.
//!
//! The entry point for decoding is [`modem::sstv::SstvReceiver`]. It takes one
//! audio sample at a time and reports [`modem::sstv::SyncEvent`]s as the
//! header is acquired.

pub mod agc;
pub mod filter;
pub mod modem;
pub mod scan;
pub mod source;
