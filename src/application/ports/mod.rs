pub mod deferred_usage;
