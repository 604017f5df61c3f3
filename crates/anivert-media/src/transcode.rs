//! Faststart H.264 transcode pass.
//!
//! The intermediate container out of the frame pipeline is not
//! browser-friendly; this boundary step re-encodes it to H.264 with the
//! moov atom up front so playback can start before the download finishes.
//! Succeed-or-fail: there is no partial output contract.

use std::path::Path;

use tracing::debug;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

/// Re-encode `input` into a browser-streamable H.264 file at `output`.
pub async fn transcode_faststart(input: &Path, output: &Path) -> MediaResult<()> {
    debug!(
        input = %input.display(),
        output = %output.display(),
        "Transcoding to faststart H.264"
    );

    let cmd = FfmpegCommand::new(input, output)
        .output_args(["-movflags", "+faststart"])
        .video_codec("libx264")
        .preset("veryfast")
        .crf(23);

    cmd.run().await.map_err(|e| match e {
        MediaError::FfmpegFailed {
            message,
            stderr,
            exit_code,
        } => MediaError::TranscodeFailed {
            message,
            stderr,
            exit_code,
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_arguments() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4")
            .output_args(["-movflags", "+faststart"])
            .video_codec("libx264")
            .preset("veryfast")
            .crf(23);

        let args = cmd.build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-movflags +faststart"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-preset veryfast"));
        assert!(joined.contains("-crf 23"));
    }
}
