//! Actions bound to the physical inputs

mod play_pause;
mod tag;
mod volume;

pub use play_pause::PlayPause;
pub use tag::{handle_tag, TagOutcome, TagWorker};
pub use volume::{apply_delta, VolumeButton, VolumeDelta};
