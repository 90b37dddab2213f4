pub mod cache;
pub mod dispatcher;
pub mod http;
pub mod ingestor;
pub mod notifier;
pub mod queue;
