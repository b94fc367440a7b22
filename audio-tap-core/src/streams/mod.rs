pub mod file_stream;
