use crate::model::{MIME_TYPE_AUDIO, MIME_TYPE_DASH, MIME_TYPE_HLS, MIME_TYPE_VIDEO_MP4, MediaItem};

/// Built-in sample catalogue, one sample per supported source family.
pub fn default_samples() -> Vec<MediaItem> {
    vec![
        MediaItem::new(
            "https://storage.googleapis.com/wvmedia/clear/h264/tears/tears.mpd",
            "DASH (clear,MP4,H264)",
            MIME_TYPE_DASH,
        ),
        MediaItem::new(
            "https://commondatastorage.googleapis.com/gtv-videos-bucket/CastVideos/hls/TearsOfSteel.m3u8",
            "Tears of Steel (HLS)",
            MIME_TYPE_HLS,
        ),
        MediaItem::new(
            "https://html5demos.com/assets/dizzy.mp4",
            "Dizzy (MP4)",
            MIME_TYPE_VIDEO_MP4,
        ),
        MediaItem::new(
            "https://storage.googleapis.com/exoplayer-test-media-1/ogg/play.ogg",
            "Google Play (Ogg/Vorbis Audio)",
            MIME_TYPE_AUDIO,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MediaSourceFactory;

    #[test]
    fn test_default_samples_are_playable() {
        let factory = MediaSourceFactory::default();
        for sample in default_samples() {
            assert!(factory.create(&sample).is_ok(), "{}", sample);
        }
    }
}
