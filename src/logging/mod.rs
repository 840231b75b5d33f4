pub mod runtime_logger;
