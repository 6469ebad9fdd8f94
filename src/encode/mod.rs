pub mod ffmpeg;
pub mod manifest;
