//! Process exit codes. Part of the CLI contract.

pub const SUCCESS: i32 = 0;
pub const CONFIG_ERROR: i32 = 2; // Missing credential, unreadable or invalid config
pub const INPUT_ERROR: i32 = 3; // Malformed dataset/generations, unwritable output
