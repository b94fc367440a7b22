pub mod audio_level;
pub mod cadence;
pub mod frame_mixer;
pub mod frame_ops;
pub mod frame_source;
pub mod linear_resampler;
pub mod passthrough;
pub mod realtime;
pub mod tap_sink;
pub mod typing_detection;
pub mod worker;
