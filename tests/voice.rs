//! Voice component integration tests
//!
//! Tests voice components without requiring audio hardware

use friday_assistant::voice::{
    Backoff, Classification, ErrorDisposition, HINDI_LANG, Prosody, RecognitionErrorKind,
    SAMPLE_RATE, SegmentState, SpeechOutput, UtteranceSegmenter, Voice, WakeWordDetector,
    samples_to_wav, select_voice,
};
use std::io::Cursor;
use std::time::Duration;

mod common;

use common::MockSynthesizer;

/// Generate sine wave audio samples
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

fn friday() -> WakeWordDetector {
    WakeWordDetector::new(vec!["friday".to_string()]).unwrap()
}

#[test]
fn test_wake_word_normalization() {
    let detector = WakeWordDetector::new(vec!["  Hey FRIDAY  ".to_string()]).unwrap();

    // Should be normalized to lowercase and trimmed
    assert_eq!(detector.wake_words(), &["hey friday"]);
}

#[test]
fn test_empty_wake_word_rejected() {
    assert!(WakeWordDetector::new(vec![]).is_err());
    assert!(WakeWordDetector::new(vec!["   ".to_string()]).is_err());
}

#[test]
fn test_no_wake_word_not_matched() {
    let detector = friday();

    assert_eq!(detector.classify("what time is it"), Classification::NotMatched);
    assert_eq!(detector.classify(""), Classification::NotMatched);
    assert!(!detector.contains_wake_word("open youtube"));
}

#[test]
fn test_wake_word_case_insensitive() {
    let detector = friday();

    assert!(detector.contains_wake_word("FRIDAY"));
    assert!(detector.contains_wake_word("Hey Friday"));
    assert_eq!(
        detector.classify("FRIDAY Open YouTube"),
        Classification::Matched("open youtube".to_string())
    );
}

#[test]
fn test_body_is_text_minus_first_occurrence() {
    let detector = friday();

    assert_eq!(
        detector.classify("friday what time is it").command(),
        Some("what time is it")
    );
    // Only the first occurrence goes, inner whitespace is kept
    assert_eq!(
        detector.classify("friday tell friday  hi").command(),
        Some("tell friday  hi")
    );
    assert_eq!(
        detector.classify("what's up friday").command(),
        Some("what's up")
    );
}

#[test]
fn test_multi_word_wake_word() {
    let detector = WakeWordDetector::new(vec!["hey friday".to_string()]).unwrap();

    assert_eq!(
        detector.classify("hey friday what time is it").command(),
        Some("what time is it")
    );
    assert_eq!(detector.classify("friday what time is it"), Classification::NotMatched);
}

#[test]
fn test_bare_wake_word_has_empty_body() {
    let detector = friday();

    assert_eq!(
        detector.classify("  Friday  "),
        Classification::Matched(String::new())
    );
}

#[test]
fn test_substring_match_is_not_word_bounded() {
    let detector = friday();

    assert_eq!(
        detector.classify("thank god it's fridays").command(),
        Some("thank god it's s")
    );
}

#[test]
fn test_error_kind_names() {
    assert_eq!(RecognitionErrorKind::from_name("no-speech"), RecognitionErrorKind::NoSpeech);
    assert_eq!(RecognitionErrorKind::from_name("not-allowed"), RecognitionErrorKind::NotAllowed);
    assert_eq!(RecognitionErrorKind::from_name("network"), RecognitionErrorKind::Network);
    assert_eq!(
        RecognitionErrorKind::from_name("something-new"),
        RecognitionErrorKind::Other("something-new".to_string())
    );
    assert_eq!(RecognitionErrorKind::AudioCapture.name(), "audio-capture");
}

#[test]
fn test_error_backoff() {
    let backoff = Backoff::default();

    assert_eq!(
        RecognitionErrorKind::Network.disposition(&backoff),
        ErrorDisposition::Retry(Duration::from_millis(2000))
    );
    assert_eq!(
        RecognitionErrorKind::AudioCapture.disposition(&backoff),
        ErrorDisposition::Retry(Duration::from_millis(500))
    );
    assert_eq!(
        RecognitionErrorKind::NotAllowed.disposition(&backoff),
        ErrorDisposition::Fatal
    );
    assert_eq!(
        RecognitionErrorKind::NoSpeech.disposition(&backoff),
        ErrorDisposition::Ignore
    );
    assert_eq!(
        RecognitionErrorKind::Aborted.disposition(&backoff),
        ErrorDisposition::Ignore
    );
}

#[test]
fn test_voice_chain_order() {
    let mut voices = vec![
        Voice::new("Hindi Female Voice", "hi-IN"),
        Voice::new("Google US English", "en-US"),
        Voice::new("Microsoft Swara - Hindi (India)", "hi-IN"),
        Voice::new("Google हिन्दी", "hi-IN"),
    ];

    assert_eq!(select_voice(&voices).unwrap().name, "Google हिन्दी");
    voices.pop();
    assert_eq!(
        select_voice(&voices).unwrap().name,
        "Microsoft Swara - Hindi (India)"
    );
    voices.pop();
    assert_eq!(select_voice(&voices).unwrap().name, "Google US English");
    voices.pop();
    assert_eq!(select_voice(&voices).unwrap().name, "Hindi Female Voice");
    voices.pop();
    assert!(select_voice(&voices).is_none());
}

#[test]
fn test_hindi_voice_sets_language() {
    let (synth, _) = MockSynthesizer::new(vec![Voice::new("Google Hindi", "hi-IN")]);
    let output = SpeechOutput::new(Box::new(synth), Prosody::default());

    let utterance = output.prepare("Ji Sir?");
    assert_eq!(utterance.lang.as_deref(), Some(HINDI_LANG));
    assert!((utterance.prosody.pitch - 1.2).abs() < f32::EPSILON);
    assert!((utterance.prosody.rate - 1.05).abs() < f32::EPSILON);
}

#[test]
fn test_english_voice_keeps_language() {
    let (synth, _) = MockSynthesizer::new(vec![Voice::new("Google US English", "en-US")]);
    let output = SpeechOutput::new(Box::new(synth), Prosody::default());

    let utterance = output.prepare("Hello Sir!");
    assert_eq!(utterance.voice.unwrap().name, "Google US English");
    assert!(utterance.lang.is_none());
}

#[test]
fn test_speak_preempts_current_utterance() {
    let (synth, log) = MockSynthesizer::new(Vec::new());
    let mut output = SpeechOutput::new(Box::new(synth), Prosody::default());

    let first = output.speak("one").unwrap();
    let second = output.speak("two").unwrap();

    assert_ne!(first, second);
    assert_eq!(log.spoken(), vec!["one".to_string(), "two".to_string()]);
    assert_eq!(log.cancels(), 1);
}

#[test]
fn test_segmenter_waits_for_trailing_silence() {
    let mut segmenter = UtteranceSegmenter::new();

    let speech = generate_sine_samples(440.0, 0.5, 0.3);
    assert_eq!(segmenter.push(&speech), SegmentState::Speaking);
    assert_eq!(segmenter.push(&generate_silence(0.4)), SegmentState::Speaking);
    assert_eq!(segmenter.push(&generate_silence(0.6)), SegmentState::Complete);

    let utterance = segmenter.take();
    assert!(utterance.len() > speech.len());
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");

    // WAV header is 44 bytes
    assert!(wav_data.len() > 44);
}

#[test]
fn test_wav_header_matches_capture_format() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    let cursor = Cursor::new(wav_data);
    let mut reader = hound::WavReader::new(cursor).unwrap();

    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);

    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples.len(), original_samples.len());
    assert_eq!(read_samples[3], 32767);
}
