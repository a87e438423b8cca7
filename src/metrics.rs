//! Speed and accuracy formulas shared by live updates and final results.
//!
//! WPM is character based everywhere: correct characters divided by five,
//! per minute of elapsed time.

/// Characters per standard word
pub const CHARS_PER_WORD: f64 = 5.0;

/// Correctness of one target position, for rendering
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum CharState {
    Untyped,
    Correct,
    Incorrect,
}

/// Number of positions where `input` and `target` disagree, over the shorter of the two
pub fn error_count(target: &[char], input: &[char]) -> usize {
    target
        .iter()
        .zip(input.iter())
        .filter(|(expected, typed)| expected != typed)
        .count()
}

/// Percentage of typed characters that are correct, 100 when nothing is typed
pub fn accuracy(input_len: usize, errors: usize) -> u32 {
    if input_len == 0 {
        return 100;
    }
    let correct = input_len.saturating_sub(errors);
    (100.0 * correct as f64 / input_len as f64).round() as u32
}

/// Words per minute from correct characters; 0 when no time has passed
pub fn wpm(elapsed_secs: f64, correct_chars: usize) -> u32 {
    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
        return 0;
    }
    let words = correct_chars as f64 / CHARS_PER_WORD;
    let minutes = elapsed_secs / 60.0;
    (words / minutes).round() as u32
}

/// Classify every target position against the input typed so far
pub fn classify(target: &[char], input: &[char]) -> Vec<CharState> {
    target
        .iter()
        .enumerate()
        .map(|(idx, expected)| match input.get(idx) {
            None => CharState::Untyped,
            Some(typed) if typed == expected => CharState::Correct,
            Some(_) => CharState::Incorrect,
        })
        .collect()
}

/// One point of the live WPM series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WpmSample {
    pub t: f64,
    pub wpm: f64,
}

impl WpmSample {
    pub fn new(t: f64, wpm: f64) -> Self {
        Self { t, wpm }
    }
}

impl From<WpmSample> for (f64, f64) {
    fn from(p: WpmSample) -> Self {
        (p.t, p.wpm)
    }
}
