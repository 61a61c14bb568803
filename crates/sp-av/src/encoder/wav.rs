//! In-process WAV encoder.

use async_trait::async_trait;
use bytes::Bytes;
use sp_core::{AudioFormat, Error};

use super::{check_input, EncodeInput, EncodeRequest, EncodeTarget, Encoder};
use crate::pcm::WavEncoding;

/// Writes segments as WAV with `hound`. Needs no external tools, so it is
/// always ready; any other target is rejected.
#[derive(Debug, Clone, Copy)]
pub struct WavEncoder {
    encoding: WavEncoding,
}

impl WavEncoder {
    pub fn new(encoding: WavEncoding) -> Self {
        Self { encoding }
    }
}

impl Default for WavEncoder {
    fn default() -> Self {
        Self::new(WavEncoding::Int16)
    }
}

#[async_trait]
impl Encoder for WavEncoder {
    fn name(&self) -> &'static str {
        "wav"
    }

    async fn ensure_ready(&self) -> sp_core::Result<()> {
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn encode(&self, request: EncodeRequest) -> sp_core::Result<Bytes> {
        check_input(&request)?;
        match (request.input, request.target) {
            (
                EncodeInput::Pcm(pcm),
                EncodeTarget::Audio {
                    format: AudioFormat::Wav,
                    ..
                },
            ) => pcm.to_wav_bytes(self.encoding).map(Bytes::from),
            (_, target) => Err(Error::EncodeRejected(format!(
                "wav encoder cannot produce .{}",
                target.extension()
            ))),
        }
    }
}
