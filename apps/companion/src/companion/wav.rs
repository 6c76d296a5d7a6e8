use bytes::{BufMut, Bytes, BytesMut};

use crate::assets::AudioBlob;

pub const WAV_CONTENT_TYPE: &str = "audio/wav";
const DEFAULT_SAMPLE_RATE: u32 = 24_000;
const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Wraps raw 16-bit mono PCM (`audio/L16`, `audio/pcm`) in a WAV container.
/// Anything else is returned unchanged.
pub fn into_playable(blob: AudioBlob) -> AudioBlob {
    let essence = blob
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence != "audio/l16" && essence != "audio/pcm" {
        return blob;
    }

    let rate = sample_rate(&blob.content_type).unwrap_or(DEFAULT_SAMPLE_RATE);
    AudioBlob {
        bytes: wrap_pcm(&blob.bytes, rate),
        content_type: WAV_CONTENT_TYPE.to_string(),
    }
}

fn sample_rate(content_type: &str) -> Option<u32> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("rate"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

fn wrap_pcm(pcm: &[u8], sample_rate: u32) -> Bytes {
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = pcm.len() as u32;

    let mut out = BytesMut::with_capacity(44 + pcm.len());
    out.put_slice(b"RIFF");
    out.put_u32_le(36 + data_len);
    out.put_slice(b"WAVE");

    out.put_slice(b"fmt ");
    out.put_u32_le(16);
    out.put_u16_le(1); // PCM
    out.put_u16_le(CHANNELS);
    out.put_u32_le(sample_rate);
    out.put_u32_le(byte_rate);
    out.put_u16_le(block_align);
    out.put_u16_le(BITS_PER_SAMPLE);

    out.put_slice(b"data");
    out.put_u32_le(data_len);
    out.put_slice(pcm);
    out.freeze()
}
