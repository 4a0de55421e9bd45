pub mod matcher;
pub mod reader;
pub mod request;
pub mod response;
pub mod server;
