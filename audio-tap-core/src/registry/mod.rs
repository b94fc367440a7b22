pub mod coupling;
pub mod null_poller;
pub mod stream_registry;
