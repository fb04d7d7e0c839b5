pub mod comments;
pub mod connection;
pub mod dispatcher;
