//! FFmpeg CLI wrapper for HLS transcoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and subprocess execution
//! - HLS rendition conversion with the fixed codec profile
//! - Master playlist assembly with deterministic bandwidth estimates

pub mod command;
pub mod error;
pub mod hls;
pub mod playlist;

pub use command::FfmpegCommand;
pub use error::{MediaError, MediaResult};
pub use hls::convert_rendition;
pub use playlist::{master_playlist_content, write_master_playlist, MASTER_PLAYLIST};
