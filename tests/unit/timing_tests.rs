/*!
 * Tests for word allocation and subtitle timing
 */

use dubsync::errors::TimingError;
use dubsync::timing::{Segment, SubtitleTimer, TimingPolicy, WordStream};
use crate::common;

fn build(policy: TimingPolicy, segments: &[Segment], text: &str) -> dubsync::timing::TimedSubtitles {
    SubtitleTimer::new(policy).build(segments, text).unwrap()
}

/// Paced cues never overlap, whatever the segment layout
#[test]
fn test_paced_withGeneratedSegments_shouldNeverOverlap() {
    for seed in 0..200 {
        let segments = common::generated_segments(seed, 1 + (seed as usize % 25));
        let total: usize = segments.iter().map(|s| s.word_count).sum();
        let text = common::numbered_words(total);

        let timed = build(TimingPolicy::Paced, &segments, &text);
        for pair in timed.entries.windows(2) {
            assert!(
                pair[0].end <= pair[1].start,
                "seed {}: cue {} ends at {} after cue {} starts at {}",
                seed, pair[0].index, pair[0].end, pair[1].index, pair[1].start
            );
        }
    }
}

/// Every cue keeps its segment's start time under both policies
#[test]
fn test_build_withEitherPolicy_shouldKeepSegmentStarts() {
    let segments = common::generated_segments(7, 12);
    let text = common::numbered_words(40);

    for policy in [TimingPolicy::Naive, TimingPolicy::Paced] {
        let timed = build(policy, &segments, &text);
        assert_eq!(timed.entries.len(), segments.len());
        for (i, (entry, segment)) in timed.entries.iter().zip(&segments).enumerate() {
            assert_eq!(entry.index, i + 1);
            assert_eq!(entry.start, segment.start);
            assert!(entry.end >= entry.start);
        }
    }
}

/// Concatenated cue texts are a prefix of the translated stream
#[test]
fn test_allocation_withAnyWordCounts_shouldPartitionPrefixInOrder() {
    let text = common::numbered_words(30);
    let words: Vec<&str> = text.split_whitespace().collect();

    for seed in 0..50 {
        let segments = common::generated_segments(seed, 8);
        let timed = build(TimingPolicy::Naive, &segments, &text);

        let allocated: Vec<&str> = timed
            .entries
            .iter()
            .flat_map(|e| e.content.split_whitespace())
            .collect();
        assert_eq!(allocated.as_slice(), &words[..allocated.len()], "seed {}", seed);
        assert_eq!(timed.words_consumed, allocated.len());
        assert_eq!(timed.words_consumed + timed.words_unused, words.len());

        for (entry, segment) in timed.entries.iter().zip(&segments) {
            assert!(entry.content.split_whitespace().count() <= segment.word_count);
        }
    }
}

/// Naive timing copies the segment end times
#[test]
fn test_naive_withOverlappingSegments_shouldCopyEndTimes() {
    let segments = vec![
        Segment::new(0.0, 4.0, 2),
        Segment::new(3.0, 6.0, 1),
    ];
    let timed = build(TimingPolicy::Naive, &segments, "a b c");

    assert_eq!(timed.entries[0].end, 4.0);
    assert_eq!(timed.entries[1].end, 6.0);
    assert!(timed.rate.is_none());
}

/// Paced timing uses the global words per second
#[test]
fn test_paced_withWorkedExample_shouldPaceAndClamp() {
    let segments = vec![
        Segment::from_text(0.0, 2.0, "x y"),
        Segment::from_text(2.0, 5.0, "z w v"),
    ];
    let timed = build(TimingPolicy::Paced, &segments, "one two three four five");

    // 5 words over 5 seconds
    assert!((timed.rate.unwrap().words_per_second - 1.0).abs() < 1e-12);
    assert_eq!(timed.entries[0].content, "one two");
    assert_eq!(timed.entries[0].end, 2.0);
    assert_eq!(timed.entries[1].content, "three four five");
    assert_eq!(timed.entries[1].end, 5.0);
}

/// A fast speaker yields a cue shorter than its segment, a slow one is clamped
#[test]
fn test_paced_withUnevenSegments_shouldShortenOrClamp() {
    // 8 words over 10 seconds: 0.8 words/s
    let segments = vec![
        Segment::new(0.0, 5.0, 2),
        Segment::new(5.0, 6.0, 4),
        Segment::new(6.0, 10.0, 2),
    ];
    let timed = build(TimingPolicy::Paced, &segments, &common::numbered_words(8));

    assert!((timed.entries[0].end - 2.5).abs() < 1e-9);
    assert_eq!(timed.entries[1].end, 6.0);
    assert!((timed.entries[2].end - 8.5).abs() < 1e-9);
}

/// The last cue is never clamped, even past the last segment's end
#[test]
fn test_paced_lastSegment_shouldNotBeClamped() {
    let segments = vec![
        Segment::new(0.0, 1.0, 1),
        Segment::new(1.0, 2.0, 3),
    ];
    // 4 words over 2 seconds: the last cue needs 1.5 s from t=1
    let timed = build(TimingPolicy::Paced, &segments, "a b c d");
    assert!((timed.entries[1].end - 2.5).abs() < 1e-9);
}

/// Zero total span falls back to one word per second
#[test]
fn test_paced_withZeroSpan_shouldFallBackToOneWordPerSecond() {
    let segments = vec![
        Segment::new(3.0, 3.0, 2),
        Segment::new(3.0, 3.0, 1),
    ];
    let timed = build(TimingPolicy::Paced, &segments, "a b c");

    assert!(timed.has_degenerate_rate());
    assert_eq!(timed.rate.unwrap().words_per_second, 1.0);
    // Clamped to the next start
    assert_eq!(timed.entries[0].end, 3.0);
    assert_eq!(timed.entries[1].end, 4.0);
}

/// Segments with no words produce zero-length empty cues
#[test]
fn test_paced_withZeroWordSegment_shouldProduceInstantCue() {
    let segments = vec![
        Segment::new(0.0, 2.0, 0),
        Segment::new(2.0, 4.0, 2),
    ];
    let timed = build(TimingPolicy::Paced, &segments, "a b");

    assert_eq!(timed.entries[0].content, "");
    assert_eq!(timed.entries[0].end, 0.0);
    assert_eq!(timed.entries[1].content, "a b");
}

/// Exhausted translations leave later cues empty and are counted
#[test]
fn test_allocation_withShortTranslation_shouldStarveLaterSegments() {
    let segments = vec![
        Segment::new(0.0, 1.0, 2),
        Segment::new(1.0, 2.0, 2),
        Segment::new(2.0, 3.0, 2),
    ];
    let timed = build(TimingPolicy::Naive, &segments, "only three words");

    assert_eq!(timed.entries[0].content, "only three");
    assert_eq!(timed.entries[1].content, "words");
    assert_eq!(timed.entries[2].content, "");
    assert_eq!(timed.starved_segments, 1);
    assert_eq!(timed.words_unused, 0);
}

/// Leftover translated words are dropped but reported
#[test]
fn test_allocation_withLongTranslation_shouldReportUnusedWords() {
    let segments = vec![Segment::new(0.0, 1.0, 1)];
    let timed = build(TimingPolicy::Paced, &segments, "a b c d");

    assert_eq!(timed.entries[0].content, "a");
    assert_eq!(timed.words_unused, 3);
}

/// Empty input yields empty output
#[test]
fn test_build_withNoSegments_shouldReturnEmpty() {
    let timed = build(TimingPolicy::Paced, &[], "anything at all");
    assert!(timed.entries.is_empty());
    assert_eq!(timed.words_unused, 3);
}

/// Malformed segments are rejected before any cue is built
#[test]
fn test_build_withMalformedSegments_shouldReturnError() {
    let timer = SubtitleTimer::new(TimingPolicy::Paced);

    let reversed = vec![Segment::new(2.0, 1.0, 1)];
    assert!(matches!(
        timer.build(&reversed, "a"),
        Err(TimingError::MalformedInput { position: 0, .. })
    ));

    let unordered = vec![Segment::new(5.0, 6.0, 1), Segment::new(1.0, 2.0, 1)];
    assert!(matches!(
        timer.build(&unordered, "a b"),
        Err(TimingError::MalformedInput { position: 1, .. })
    ));

    let not_finite = vec![Segment::new(0.0, f64::NAN, 1)];
    assert!(timer.build(&not_finite, "a").is_err());

    // SRT has no negative timestamps
    let negative = vec![Segment::new(0.0, 1.0, 1), Segment::new(-0.5, 2.0, 1)];
    assert!(matches!(
        timer.build(&negative, "a b"),
        Err(TimingError::MalformedInput { position: 1, .. })
    ));
}

/// The word stream hands out words in order and runs dry gracefully
#[test]
fn test_wordStream_take_shouldConsumeInOrder() {
    let mut stream = WordStream::new("  one two\tthree\nfour ");
    assert_eq!(stream.len(), 4);
    assert_eq!(stream.take(3), "one two three");
    assert_eq!(stream.take(3), "four");
    assert!(stream.is_exhausted());
    assert_eq!(stream.take(2), "");
    assert_eq!(stream.consumed(), 4);
    assert_eq!(stream.remaining(), 0);
}

/// Timing policies parse from their config names
#[test]
fn test_timingPolicy_fromStr_shouldParseKnownNames() {
    assert_eq!("naive".parse::<TimingPolicy>().unwrap(), TimingPolicy::Naive);
    assert_eq!("Paced".parse::<TimingPolicy>().unwrap(), TimingPolicy::Paced);
    assert!("fast".parse::<TimingPolicy>().is_err());
    assert_eq!(TimingPolicy::default(), TimingPolicy::Paced);
}
