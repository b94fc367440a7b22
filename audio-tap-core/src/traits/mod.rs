pub mod audio_sink;
pub mod device;
pub mod mixer;
pub mod resampler;
pub mod signal_processor;
pub mod stream;
pub mod transport;
