//! Integration tests for the progress parser.
//!
//! These feed a realistic downloader transcript through [`parse_line`].

use dlqueue_core::parser::{extract_urls, extract_video_id};
use dlqueue_core::{ProgressLine, parse_line};

const TRANSCRIPT: &str = r#"[youtube] Extracting URL: https://www.youtube.com/watch?v=dQw4w9WgXcQ
[youtube] dQw4w9WgXcQ: Downloading webpage
[info] dQw4w9WgXcQ: Downloading 1 format(s): 137+140
[download] Destination: /videos/Never Gonna Give You Up [dQw4w9WgXcQ].f137.mp4
[download]   0.0% of   80.53MiB at  Unknown B/s ETA Unknown
[download]  12.4% of   80.53MiB at    5.12MiB/s ETA 00:13
[download] 100.0% of   80.53MiB at    6.01MiB/s ETA 00:00
[Merger] Merging formats into "/videos/Never Gonna Give You Up [dQw4w9WgXcQ].mp4"
Deleting original file /videos/Never Gonna Give You Up [dQw4w9WgXcQ].f137.mp4 (pass -k to keep)
"#;

#[test]
fn test_transcript_yields_progress_and_final_destination() {
    let parsed: Vec<ProgressLine> = TRANSCRIPT
        .lines()
        .map(parse_line)
        .filter(|line| !line.is_empty())
        .collect();

    let percents: Vec<f64> = parsed
        .iter()
        .filter(|line| line.percent > 0.0)
        .map(|line| line.percent)
        .collect();
    assert_eq!(percents, vec![12.4, 100.0]);

    let destinations: Vec<&str> = parsed
        .iter()
        .filter(|line| !line.destination.is_empty())
        .map(|line| line.destination.as_str())
        .collect();
    assert_eq!(
        destinations.last().copied(),
        Some("/videos/Never Gonna Give You Up [dQw4w9WgXcQ].mp4")
    );

    let midway = parsed
        .iter()
        .find(|line| (line.percent - 12.4).abs() < f64::EPSILON)
        .expect("12.4% line");
    assert_eq!(midway.speed, "5.12MiB/s");
    assert_eq!(midway.eta, "00:13");
    assert_eq!(midway.phase, "[download]");
}

#[test]
fn test_noise_lines_decode_empty() {
    for line in [
        "",
        "   ",
        "[youtube] dQw4w9WgXcQ: Downloading webpage",
        "WARNING: something odd",
    ] {
        assert!(parse_line(line).is_empty(), "expected empty for {line:?}");
    }
}

#[test]
fn test_urls_from_pasted_list_keep_order() {
    let input = "watch these:\nhttps://www.youtube.com/watch?v=aaaaaaaaaaa\nhttps://youtu.be/bbbbbbbbbbb, and\nhttps://www.youtube.com/shorts/ccccccccccc";
    let urls: Vec<String> = extract_urls(input)
        .into_iter()
        .collect::<Result<_, _>>()
        .expect("all valid");
    assert_eq!(urls.len(), 3);
    let ids: Vec<Option<String>> = urls.iter().map(|u| extract_video_id(u)).collect();
    assert_eq!(
        ids,
        vec![
            Some("aaaaaaaaaaa".to_string()),
            Some("bbbbbbbbbbb".to_string()),
            Some("ccccccccccc".to_string()),
        ]
    );
}
