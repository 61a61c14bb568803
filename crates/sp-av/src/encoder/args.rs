//! ffmpeg argument lists for the two kinds of encode.

use std::path::Path;

use sp_core::{AudioFormat, CutPrecision, VideoContainer};

use crate::extract::CutSpec;

/// Codec name and whether it takes a target bitrate.
fn audio_codec(format: AudioFormat) -> (&'static str, bool) {
    match format {
        AudioFormat::Mp3 => ("libmp3lame", true),
        AudioFormat::Aac => ("aac", true),
        AudioFormat::Opus => ("libopus", true),
        AudioFormat::Flac => ("flac", false),
        AudioFormat::Wav => ("pcm_s16le", false),
    }
}

/// Seconds with millisecond precision, the form ffmpeg expects for `-ss`/`-t`.
fn seconds(t: f64) -> String {
    format!("{t:.3}")
}

fn path_arg(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// Encode a staged WAV file into `format`.
///
/// Lossless formats ignore `bitrate_kbps`.
pub fn audio_args(input: &Path, output: &Path, format: AudioFormat, bitrate_kbps: u32) -> Vec<String> {
    let (codec, uses_bitrate) = audio_codec(format);

    let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostdin".into(), "-y".into()];
    args.extend(["-i".into(), path_arg(input)]);
    args.extend(["-vn".into(), "-c:a".into(), codec.into()]);
    if uses_bitrate {
        args.extend(["-b:a".into(), format!("{bitrate_kbps}k")]);
    }
    args.push(path_arg(output));
    args
}

/// Cut `[cut.start, cut.end)` out of a staged video file.
///
/// [`CutPrecision::StreamCopy`] seeks on the input and copies every stream,
/// so the cut lands on the nearest preceding keyframe.
/// [`CutPrecision::Reencode`] decodes and re-encodes for frame accuracy.
pub fn cut_args(
    input: &Path,
    output: &Path,
    cut: CutSpec,
    container: VideoContainer,
    precision: CutPrecision,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostdin".into(), "-y".into()];
    args.extend(["-ss".into(), seconds(cut.start)]);
    args.extend(["-i".into(), path_arg(input)]);
    args.extend(["-t".into(), seconds(cut.duration())]);

    match precision {
        CutPrecision::StreamCopy => {
            args.extend(["-map".into(), "0".into(), "-c".into(), "copy".into()]);
            args.extend(["-avoid_negative_ts".into(), "make_zero".into()]);
        }
        CutPrecision::Reencode => {
            let (video, audio) = match container {
                VideoContainer::Webm => ("libvpx-vp9", "libopus"),
                VideoContainer::Mp4 | VideoContainer::Mkv | VideoContainer::Mov => ("libx264", "aac"),
            };
            args.extend(["-map".into(), "0:v?".into(), "-map".into(), "0:a?".into()]);
            args.extend(["-c:v".into(), video.into(), "-c:a".into(), audio.into()]);
        }
    }

    args.push(path_arg(output));
    args
}
