//! Parsing of yt-dlp progress lines

use super::EngineProgress;

/// Prefix of the progress lines requested through `--progress-template`
pub(crate) const PROGRESS_PREFIX: &str = "[media-dl]";

/// Template passed to `--progress-template`; produces lines like `[media-dl] 42.5% 17`
pub(crate) const PROGRESS_TEMPLATE: &str =
    "download:[media-dl] %(progress._percent_str)s %(progress.eta)s";

/// Parse one stdout line into a progress report
///
/// Returns `None` for anything that is not a progress line. An unknown ETA
/// (`NA`, `None`) is reported as `None`.
///
/// ```
/// use media_dl::engine::parse_progress_line;
///
/// let p = parse_progress_line("[media-dl]  42.5% 17").unwrap();
/// assert_eq!(p.percent, 42.5);
/// assert_eq!(p.eta_seconds, Some(17));
/// assert!(parse_progress_line("[download] Destination: clip.mp4").is_none());
/// ```
pub fn parse_progress_line(line: &str) -> Option<EngineProgress> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut tokens = rest.split_whitespace();

    let percent = tokens
        .next()?
        .trim_end_matches('%')
        .parse::<f32>()
        .ok()
        .filter(|p| p.is_finite())?;

    let eta_seconds = tokens.next().and_then(|eta| {
        eta.parse::<f64>()
            .ok()
            .filter(|e| e.is_finite() && *e >= 0.0)
            .map(|e| e.round() as u64)
    });

    Some(EngineProgress {
        percent,
        eta_seconds,
    })
}
