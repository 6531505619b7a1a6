//! Progress checkpoints for the three pipeline stages.

/// Progress of a freshly queued job.
pub const PROGRESS_QUEUED: u8 = 0;
/// Progress once the script stage has produced scene descriptions.
pub const PROGRESS_SCRIPT_DONE: u8 = 25;
/// Share of the bar covered by the per-scene media stage.
pub const PROGRESS_MEDIA_SPAN: u8 = 65;
/// Progress of a completed job.
pub const PROGRESS_COMPLETE: u8 = 100;

/// Progress after `completed` of `total` scenes have finished their media.
///
/// `25 + round(65 * completed / total)`, rounding halves up. Zero scenes or
/// `completed > total` are clamped so the result stays within the media band.
pub fn media_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_SCRIPT_DONE + PROGRESS_MEDIA_SPAN;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    let span = u64::from(PROGRESS_MEDIA_SPAN);
    let rounded = (2 * span * completed + total) / (2 * total);
    PROGRESS_SCRIPT_DONE + rounded as u8
}
