//! Wire-format codecs shared by servers and clients.

pub mod xmlrpc;
