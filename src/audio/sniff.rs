// Metadata sniffing - container detection and header fields for the info line
//
// Detection is by magic bytes, with the file extension used only when the
// magic is not recognised. Each container kind has its own header parser;
// every field is optional and a failed parse never blocks rendering.

use serde::{Deserialize, Serialize};

use super::decode::DecodedAudio;

/// Supported container kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Wav,
    Flac,
    Aiff,
    Mp3,
    Ogg,
    Mp4,
    Unknown,
}

/// Display-only metadata gathered from container headers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    pub container: ContainerKind,
    pub codec: String,
    pub sample_rate: Option<u32>,
    pub channel_count: Option<u16>,
    pub bit_depth: Option<u16>,
}

impl ContainerKind {
    /// Identify the container from its leading bytes, falling back to the extension
    pub fn detect(bytes: &[u8], extension: Option<&str>) -> Self {
        if has_magic(bytes, 0, b"RIFF") && has_magic(bytes, 8, b"WAVE") {
            ContainerKind::Wav
        } else if has_magic(bytes, 0, b"fLaC") {
            ContainerKind::Flac
        } else if has_magic(bytes, 0, b"FORM")
            && (has_magic(bytes, 8, b"AIFF") || has_magic(bytes, 8, b"AIFC"))
        {
            ContainerKind::Aiff
        } else if has_magic(bytes, 0, b"OggS") {
            ContainerKind::Ogg
        } else if has_magic(bytes, 4, b"ftyp") {
            ContainerKind::Mp4
        } else if has_magic(bytes, 0, b"ID3") || find_mpeg_frame(bytes, 0).is_some() {
            ContainerKind::Mp3
        } else {
            extension
                .map(Self::from_extension)
                .unwrap_or(ContainerKind::Unknown)
        }
    }

    fn from_extension(extension: &str) -> Self {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "wav" | "wave" => ContainerKind::Wav,
            "flac" => ContainerKind::Flac,
            "aif" | "aiff" | "aifc" => ContainerKind::Aiff,
            "mp3" => ContainerKind::Mp3,
            "ogg" | "oga" | "opus" => ContainerKind::Ogg,
            "mp4" | "m4a" | "aac" => ContainerKind::Mp4,
            _ => ContainerKind::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContainerKind::Wav => "WAV",
            ContainerKind::Flac => "FLAC",
            ContainerKind::Aiff => "AIFF",
            ContainerKind::Mp3 => "MP3",
            ContainerKind::Ogg => "OGG",
            ContainerKind::Mp4 => "MP4",
            ContainerKind::Unknown => "unknown",
        }
    }

    fn parse(&self, bytes: &[u8]) -> AudioMetadata {
        let parsed = match self {
            ContainerKind::Wav => parse_wav(bytes),
            ContainerKind::Flac => parse_flac(bytes),
            ContainerKind::Aiff => parse_aiff(bytes),
            ContainerKind::Mp3 => parse_mp3(bytes),
            ContainerKind::Ogg => parse_ogg(bytes),
            ContainerKind::Mp4 | ContainerKind::Unknown => None,
        };
        parsed.unwrap_or_else(|| AudioMetadata::bare(*self))
    }
}

impl AudioMetadata {
    /// Info line for this file, using the decoded stream for rate and channels
    pub fn summary(&self, decoded: &DecodedAudio, file_size: usize) -> String {
        info_line(
            decoded.sample_rate,
            self.bit_depth,
            decoded.channel_count,
            decoded.duration_secs(),
            file_size,
        )
    }

    fn bare(container: ContainerKind) -> Self {
        Self {
            container,
            codec: container.label().to_string(),
            sample_rate: None,
            channel_count: None,
            bit_depth: None,
        }
    }
}

/// Sniff container metadata; always returns something displayable
pub fn sniff(bytes: &[u8], extension: Option<&str>) -> AudioMetadata {
    ContainerKind::detect(bytes, extension).parse(bytes)
}

fn stream_parts(
    sample_rate: u32,
    bit_depth: Option<u16>,
    channel_count: u16,
    duration_secs: f64,
) -> Vec<String> {
    let mut parts = vec![format!("{}kHz", (sample_rate as f64 / 1e3).round())];
    if let Some(bits) = bit_depth.filter(|&b| b > 0) {
        parts.push(format!("{}bit", bits));
    }
    parts.push(format!("{}ch", channel_count));
    parts.push(format_clock(duration_secs));
    parts
}

/// Info line for audio that did not come from a file, e.g. `44kHz  1ch  0:05`
pub fn stream_summary(sample_rate: u32, channel_count: u16, duration_secs: f64) -> String {
    stream_parts(sample_rate, None, channel_count, duration_secs).join("  ")
}

/// Human-readable info line, e.g. `44kHz  16bit  2ch  0:05  1411kbps  1.20MB`
///
/// Rate and channel count come from the decoded stream; the bit depth only
/// from the container header, when it has one.
pub fn info_line(
    sample_rate: u32,
    bit_depth: Option<u16>,
    channel_count: u16,
    duration_secs: f64,
    file_size: usize,
) -> String {
    let mut parts = stream_parts(sample_rate, bit_depth, channel_count, duration_secs);

    let kbps = if duration_secs > 0.0 {
        (file_size as f64 * 8.0 / duration_secs / 1e3) as u64
    } else {
        0
    };
    parts.push(format!("{}kbps", kbps));

    let mib = file_size as f64 / 1_048_576.0;
    parts.push(if mib >= 1.0 {
        format!("{:.2}MB", mib)
    } else {
        format!("{:.1}KB", file_size as f64 / 1024.0)
    });

    parts.join("  ")
}

/// `m:ss` with truncated seconds
pub fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn has_magic(bytes: &[u8], offset: usize, tag: &[u8]) -> bool {
    bytes.get(offset..offset + tag.len()) == Some(tag)
}

fn u16_le(b: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(b.get(at..at + 2)?.try_into().ok()?))
}

fn u32_le(b: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(b.get(at..at + 4)?.try_into().ok()?))
}

fn u16_be(b: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes(b.get(at..at + 2)?.try_into().ok()?))
}

fn u32_be(b: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_be_bytes(b.get(at..at + 4)?.try_into().ok()?))
}

fn parse_wav(b: &[u8]) -> Option<AudioMetadata> {
    let mut pos = 12;
    while pos + 8 <= b.len() {
        let size = u32_le(b, pos + 4)? as usize;
        if &b[pos..pos + 4] == b"fmt " {
            let format_tag = u16_le(b, pos + 8)?;
            let codec = match format_tag {
                1 => "PCM",
                3 => "IEEE float",
                0xFFFE => "PCM (extensible)",
                _ => "WAV",
            };
            return Some(AudioMetadata {
                container: ContainerKind::Wav,
                codec: codec.to_string(),
                channel_count: u16_le(b, pos + 10),
                sample_rate: u32_le(b, pos + 12),
                bit_depth: u16_le(b, pos + 22),
            });
        }
        // chunks are word aligned
        pos = pos.checked_add(8 + size + (size & 1))?;
    }
    None
}

fn parse_flac(b: &[u8]) -> Option<AudioMetadata> {
    // STREAMINFO is mandatory and always the first metadata block
    let info = b.get(8..22)?;
    let sample_rate =
        ((info[10] as u32) << 12) | ((info[11] as u32) << 4) | ((info[12] as u32) >> 4);
    let channels = ((info[12] >> 1) & 0x07) as u16 + 1;
    let bits = ((((info[12] & 0x01) << 4) | (info[13] >> 4)) as u16) + 1;
    Some(AudioMetadata {
        container: ContainerKind::Flac,
        codec: "FLAC".to_string(),
        sample_rate: Some(sample_rate).filter(|&r| r > 0),
        channel_count: Some(channels),
        bit_depth: Some(bits),
    })
}

/// IEEE 754 80-bit extended float, as used by the AIFF `COMM` chunk
fn extended_to_f64(raw: &[u8]) -> Option<f64> {
    let raw = raw.get(..10)?;
    let exponent = (((raw[0] & 0x7F) as i32) << 8 | raw[1] as i32) - 16_383;
    let mantissa = u64::from_be_bytes(raw[2..10].try_into().ok()?);
    let sign = if raw[0] & 0x80 != 0 { -1.0 } else { 1.0 };
    Some(sign * mantissa as f64 * 2f64.powi(exponent - 63))
}

fn parse_aiff(b: &[u8]) -> Option<AudioMetadata> {
    let compressed = b.get(8..12)? == b"AIFC";
    let mut pos = 12;
    while pos + 8 <= b.len() {
        let size = u32_be(b, pos + 4)? as usize;
        if &b[pos..pos + 4] == b"COMM" {
            let codec = if compressed {
                b.get(pos + 26..pos + 30)
                    .map(|tag| String::from_utf8_lossy(tag).trim().to_string())
                    .unwrap_or_else(|| "AIFC".to_string())
            } else {
                "PCM".to_string()
            };
            return Some(AudioMetadata {
                container: ContainerKind::Aiff,
                codec,
                channel_count: u16_be(b, pos + 8),
                bit_depth: u16_be(b, pos + 14),
                sample_rate: b
                    .get(pos + 16..pos + 26)
                    .and_then(extended_to_f64)
                    .filter(|rate| *rate > 0.0)
                    .map(|rate| rate.round() as u32),
            });
        }
        pos = pos.checked_add(8 + size + (size & 1))?;
    }
    None
}

/// Offset of the first plausible MPEG audio frame header at or after `from`
fn find_mpeg_frame(b: &[u8], from: usize) -> Option<usize> {
    let limit = b.len().min(from + 64 * 1024);
    (from..limit.saturating_sub(3)).find(|&i| {
        b[i] == 0xFF
            && b[i + 1] & 0xE0 == 0xE0
            && (b[i + 1] >> 3) & 0x03 != 0x01
            && (b[i + 1] >> 1) & 0x03 != 0x00
            && (b[i + 2] >> 2) & 0x03 != 0x03
            && b[i + 2] >> 4 != 0x0F
    })
}

fn parse_mp3(b: &[u8]) -> Option<AudioMetadata> {
    let mut start = 0;
    if b.get(..3) == Some(&b"ID3"[..]) {
        let header = b.get(6..10)?;
        let size = header
            .iter()
            .fold(0usize, |acc, &byte| (acc << 7) | (byte & 0x7F) as usize);
        let footer = if b.get(5)? & 0x10 != 0 { 10 } else { 0 };
        start = 10 + size + footer;
    }

    let at = find_mpeg_frame(b, start)?;
    let version = (b[at + 1] >> 3) & 0x03;
    let layer = (b[at + 1] >> 1) & 0x03;
    let rate_index = ((b[at + 2] >> 2) & 0x03) as usize;
    let rates: [u32; 3] = match version {
        0x03 => [44_100, 48_000, 32_000],
        0x02 => [22_050, 24_000, 16_000],
        _ => [11_025, 12_000, 8_000],
    };
    let codec = match layer {
        0x01 => "MP3",
        0x02 => "MP2",
        _ => "MP1",
    };
    let channels = if b[at + 3] >> 6 == 0x03 { 1 } else { 2 };

    Some(AudioMetadata {
        container: ContainerKind::Mp3,
        codec: codec.to_string(),
        sample_rate: rates.get(rate_index).copied(),
        channel_count: Some(channels),
        bit_depth: None,
    })
}

fn parse_ogg(b: &[u8]) -> Option<AudioMetadata> {
    let segments = *b.get(26)? as usize;
    let payload = b.get(27 + segments..)?;

    if payload.get(..7) == Some(&b"\x01vorbis"[..]) {
        Some(AudioMetadata {
            container: ContainerKind::Ogg,
            codec: "Vorbis".to_string(),
            channel_count: payload.get(11).map(|&c| c as u16),
            sample_rate: u32_le(payload, 12),
            bit_depth: None,
        })
    } else if payload.get(..8) == Some(&b"OpusHead"[..]) {
        // Opus always decodes at 48 kHz regardless of the input rate field
        Some(AudioMetadata {
            container: ContainerKind::Ogg,
            codec: "Opus".to_string(),
            channel_count: payload.get(9).map(|&c| c as u16),
            sample_rate: Some(48_000),
            bit_depth: None,
        })
    } else if payload.get(..5) == Some(&b"\x7fFLAC"[..]) {
        Some(AudioMetadata {
            codec: "FLAC".to_string(),
            ..AudioMetadata::bare(ContainerKind::Ogg)
        })
    } else {
        None
    }
}
