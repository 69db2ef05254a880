// Audio module - decoded sources, container sniffing, and synthetic signals

pub mod decode;
pub mod sniff;
pub mod source;
pub mod synthetic;

pub use decode::{AudioDecoder, DecodedAudio, WavDecoder};
pub use sniff::{format_clock, info_line, sniff, stream_summary, AudioMetadata, ContainerKind};
pub use source::AudioSource;
