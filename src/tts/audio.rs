//! Playable speech references.

use base64::Engine as _;

use crate::audio::AudioClip;

/// A 44-byte WAV header with no samples: plays as silence.
pub const SILENT_WAV: &[u8; 44] = b"RIFF\x28\x00\x00\x00WAVEfmt \x10\x00\x00\x00\x01\x00\x01\x00\x44\xac\x00\x00\x88\x58\x01\x00\x02\x00\x10\x00data\x04\x00\x00\x00";

/// Which strategy produced a [`SpeechAudio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechSource {
    Cloud,
    Custom,
    /// The on-device synthesiser spoke the text directly.
    Native,
    Placeholder,
}

/// Synthesised audio, or a silent stand-in when synthesis was not possible.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechAudio {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub source: SpeechSource,
}

impl SpeechAudio {
    pub fn mp3(bytes: Vec<u8>, source: SpeechSource) -> Self {
        Self {
            bytes,
            mime: "audio/mp3".into(),
            source,
        }
    }

    /// The silent WAV reference, tagged with `source`.
    pub fn silent(source: SpeechSource) -> Self {
        Self {
            bytes: SILENT_WAV.to_vec(),
            mime: "audio/wav".into(),
            source,
        }
    }

    /// `true` for references that carry no real speech.
    pub fn is_placeholder(&self) -> bool {
        matches!(self.source, SpeechSource::Native | SpeechSource::Placeholder)
    }

    /// `data:{mime};base64,{bytes}`, usable directly as an audio `src`.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    pub fn to_clip(&self) -> AudioClip {
        AudioClip {
            bytes: self.bytes.clone(),
            mime: self.mime.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_placeholder_matches_the_known_data_url() {
        assert_eq!(
            SpeechAudio::silent(SpeechSource::Placeholder).to_data_url(),
            "data:audio/wav;base64,UklGRigAAABXQVZFZm10IBAAAAABAAEARKwAAIhYAQACABAAZGF0YQQAAAA="
        );
    }

    #[test]
    fn placeholder_flags() {
        assert!(SpeechAudio::silent(SpeechSource::Native).is_placeholder());
        assert!(!SpeechAudio::mp3(vec![1, 2], SpeechSource::Custom).is_placeholder());
    }

    #[test]
    fn clip_keeps_mime() {
        let clip = SpeechAudio::mp3(vec![9], SpeechSource::Cloud).to_clip();
        assert_eq!(clip.extension(), "mp3");
        assert_eq!(clip.bytes, vec![9]);
    }
}
