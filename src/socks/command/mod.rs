//! SOCKS5 command parsing module
//!
//! Handles parsing SOCKS5 command requests and writing replies.

mod parser;
mod reply;

pub use parser::{decode_command_request, CommandRequest};
pub use reply::{decode_command_reply, encode_command_reply, CommandReply};
